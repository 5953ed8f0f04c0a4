//! Flat-stake value betting simulation
//!
//! For each match, back the home side when the model's home probability beats
//! the bookmaker's implied probability by the configured margin, otherwise
//! back the away side under the same test. Draws are never backed.

use serde::Serialize;
use std::fmt;

use crate::{BettingConfig, MatchOdds, MatchResult, OutcomeProbabilities};

/// Outcome of a betting simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BettingReport {
    pub initial_bankroll: f64,
    pub final_bankroll: f64,
    pub bets_placed: usize,
    pub bets_won: usize,
    /// Matches skipped because no odds were quoted
    pub skipped: usize,
    pub stake: f64,
}

impl BettingReport {
    pub fn profit(&self) -> f64 {
        self.final_bankroll - self.initial_bankroll
    }

    pub fn win_rate(&self) -> Option<f64> {
        (self.bets_placed > 0).then(|| self.bets_won as f64 / self.bets_placed as f64)
    }

    /// Profit per unit staked
    pub fn roi(&self) -> f64 {
        if self.bets_placed == 0 {
            0.0
        } else {
            self.profit() / (self.bets_placed as f64 * self.stake)
        }
    }
}

/// Which side, if any, is worth backing
pub fn value_bet(probs: &OutcomeProbabilities, odds: &MatchOdds, threshold: f64) -> Option<MatchResult> {
    let is_value = |p: f64, price: f64| price > 0.0 && p > threshold / price;
    if is_value(probs.home_win, odds.home) {
        Some(MatchResult::HomeWin)
    } else if is_value(probs.away_win, odds.away) {
        Some(MatchResult::AwayWin)
    } else {
        None
    }
}

/// Replay the strategy over predictions in chronological order
pub fn simulate_betting(
    probabilities: &[OutcomeProbabilities],
    outcomes: &[MatchResult],
    odds: &[Option<MatchOdds>],
    config: &BettingConfig,
) -> BettingReport {
    let mut report = BettingReport {
        initial_bankroll: config.initial_bankroll,
        final_bankroll: config.initial_bankroll,
        bets_placed: 0,
        bets_won: 0,
        skipped: 0,
        stake: config.stake,
    };

    for ((probs, outcome), odds) in probabilities.iter().zip(outcomes).zip(odds) {
        let Some(odds) = odds else {
            report.skipped += 1;
            continue;
        };
        let Some(pick) = value_bet(probs, odds, config.value_threshold) else {
            continue;
        };

        report.bets_placed += 1;
        report.final_bankroll -= config.stake;
        if pick == *outcome {
            report.bets_won += 1;
            report.final_bankroll += config.stake * odds.for_result(pick);
        }
    }

    log::debug!(
        "Betting simulation: {} bets, {} won, bankroll {:.2}",
        report.bets_placed,
        report.bets_won,
        report.final_bankroll
    );
    report
}

impl fmt::Display for BettingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initial bankroll: {:.2}", self.initial_bankroll)?;
        writeln!(f, "Final bankroll:   {:.2}", self.final_bankroll)?;
        writeln!(f, "Bets placed:      {}", self.bets_placed)?;
        match self.win_rate() {
            Some(rate) => writeln!(f, "Win rate:         {:.2}%", rate * 100.0)?,
            None => writeln!(f, "Win rate:         N/A")?,
        }
        write!(f, "ROI:              {:.2}%", self.roi() * 100.0)
    }
}
