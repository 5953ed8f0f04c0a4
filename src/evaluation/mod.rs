//! Out-of-sample evaluation
//!
//! Fits a classifier on the older part of the feature table and scores it on
//! the newer part, both as a classifier and as a betting strategy.

pub mod betting;
pub mod metrics;

pub use betting::{simulate_betting, BettingReport};
pub use metrics::{ClassMetrics, ClassificationReport};

use serde::Serialize;
use std::fmt;

use crate::features::FeatureTable;
use crate::model::OutcomeClassifier;
use crate::{BettingConfig, FootyError, MatchOdds, Result};

/// Full evaluation of one classifier
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub model: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub classification: ClassificationReport,
    pub betting: BettingReport,
}

/// Chronological split, fit, predict, score
pub fn evaluate(
    model: &mut dyn OutcomeClassifier,
    table: &FeatureTable,
    train_fraction: f64,
    betting: &BettingConfig,
) -> Result<EvaluationReport> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(FootyError::Config(format!(
            "train fraction must be in (0, 1), got {}",
            train_fraction
        )));
    }

    let include_odds = model.uses_odds();
    let dataset = table.matrix(include_odds);
    // Odds for every row that made it into the matrix, in the same order
    let odds: Vec<Option<MatchOdds>> = table
        .rows
        .iter()
        .filter(|row| !include_odds || row.odds.is_some())
        .map(|row| row.odds)
        .collect();

    let (train, test) = dataset.split(train_fraction);
    if train.is_empty() || test.is_empty() {
        return Err(FootyError::Schema(format!(
            "not enough feature rows to evaluate: {} usable",
            dataset.len()
        )));
    }
    log::info!(
        "Training {} model on {} rows, testing on {} rows",
        model.name(),
        train.len(),
        test.len()
    );

    model.fit(&train.features, &train.labels)?;
    let probabilities = model.predict_proba(&test.features)?;

    let classification = ClassificationReport::from_predictions(&probabilities, &test.labels);
    let betting = simulate_betting(&probabilities, &test.labels, &odds[train.len()..], betting);

    Ok(EvaluationReport {
        model: model.name().to_string(),
        train_rows: train.len(),
        test_rows: test.len(),
        classification,
        betting,
    })
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model: {} | train {} rows, test {} rows",
            self.model, self.train_rows, self.test_rows
        )?;
        writeln!(f)?;
        write!(f, "{}", self.classification)?;
        writeln!(f)?;
        writeln!(f, "--- Betting simulation ---")?;
        write!(f, "{}", self.betting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::compute_features;
    use crate::model::{EmpiricalClassifier, FormClassifier, MarketImpliedClassifier};
    use crate::{MatchOdds, MatchRecord};
    use chrono::{Duration, NaiveDate};

    /// Four teams playing weekly; every fixture priced
    fn season(rounds: usize) -> Vec<MatchRecord> {
        let teams = ["A", "B", "C", "D"];
        let pairings = [[(0, 1), (2, 3)], [(0, 2), (1, 3)], [(0, 3), (1, 2)]];
        let start = NaiveDate::from_ymd_opt(2023, 8, 12).unwrap();
        let mut matches = Vec::new();
        for round in 0..rounds {
            let day = start + Duration::days(7 * round as i64);
            for &(h, a) in &pairings[round % 3] {
                let (home, away) = if round % 2 == 0 { (h, a) } else { (a, h) };
                let hg = ((round + home) % 3) as u8;
                let ag = ((round * 2 + away) % 3) as u8;
                matches.push(
                    MatchRecord::new(day, teams[home], teams[away], hg, ag)
                        .with_odds(MatchOdds::new(2.1, 3.3, 3.6)),
                );
            }
        }
        matches
    }

    #[test]
    fn test_evaluate_empirical() {
        let table = compute_features(&season(20)).unwrap();
        let mut model = EmpiricalClassifier::default();
        let report = evaluate(&mut model, &table, 0.8, &BettingConfig::default()).unwrap();

        assert_eq!(report.train_rows + report.test_rows, table.len());
        assert_eq!(report.train_rows, (table.len() as f64 * 0.8) as usize);
        assert_eq!(report.classification.total, report.test_rows);
        assert_eq!(report.model, "empirical");
    }

    #[test]
    fn test_evaluate_market_uses_odds() {
        let table = compute_features(&season(20)).unwrap();
        let mut model = MarketImpliedClassifier;
        let report = evaluate(&mut model, &table, 0.75, &BettingConfig::default()).unwrap();

        // Flat odds: home favourite everywhere, never a value bet
        assert_eq!(report.betting.bets_placed, 0);
        assert_eq!(report.betting.skipped, 0);
        assert!(report.to_string().contains("Betting simulation"));
    }

    #[test]
    fn test_evaluate_form_model_reads_features() {
        let table = compute_features(&season(30)).unwrap();
        let mut model = FormClassifier::default();
        let report = evaluate(&mut model, &table, 0.8, &BettingConfig::default()).unwrap();
        assert_eq!(report.model, "form");
        assert_eq!(report.classification.total, report.test_rows);
        assert!(report.classification.log_loss.is_finite());
    }

    #[test]
    fn test_evaluate_rejects_bad_fraction() {
        let table = compute_features(&season(20)).unwrap();
        let mut model = EmpiricalClassifier::default();
        assert!(evaluate(&mut model, &table, 1.0, &BettingConfig::default()).is_err());
        assert!(evaluate(&mut model, &table, 0.0, &BettingConfig::default()).is_err());
    }

    #[test]
    fn test_evaluate_too_few_rows() {
        let table = compute_features(&season(3)).unwrap();
        let mut model = EmpiricalClassifier::default();
        let err = evaluate(&mut model, &table, 0.8, &BettingConfig::default()).unwrap_err();
        assert!(matches!(err, FootyError::Schema(_)));
    }
}
