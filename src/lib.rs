//! Football match outcome prediction from rolling team form
//!
//! Turns a table of historical results into leakage-free per-team form features
//! and feeds them to a replaceable outcome classifier.

pub mod data;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod predict;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Number of prior appearances aggregated into a team's form
pub const FORM_WINDOW: usize = 5;

/// Canonical team name, already alias-normalized
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(name: impl Into<String>) -> Self {
        TeamId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(name: &str) -> Self {
        TeamId(name.to_string())
    }
}

/// Full-time result of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    HomeWin,
    Draw,
    AwayWin,
}

impl MatchResult {
    pub const ALL: [MatchResult; 3] = [MatchResult::HomeWin, MatchResult::Draw, MatchResult::AwayWin];

    /// Result implied by a scoreline
    pub fn from_goals(home_goals: u8, away_goals: u8) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => MatchResult::HomeWin,
            std::cmp::Ordering::Less => MatchResult::AwayWin,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }

    /// Single-letter code used by football-data files (H, D, A)
    pub fn code(&self) -> &'static str {
        match self {
            MatchResult::HomeWin => "H",
            MatchResult::Draw => "D",
            MatchResult::AwayWin => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "H" => Some(MatchResult::HomeWin),
            "D" => Some(MatchResult::Draw),
            "A" => Some(MatchResult::AwayWin),
            _ => None,
        }
    }

    /// Class label: 0 = home win, 1 = draw, 2 = away win
    pub fn label(&self) -> usize {
        match self {
            MatchResult::HomeWin => 0,
            MatchResult::Draw => 1,
            MatchResult::AwayWin => 2,
        }
    }

    pub fn from_label(label: usize) -> Option<Self> {
        Self::ALL.get(label).copied()
    }

    /// League points earned by the home (or away) side
    pub fn points(&self, is_home: bool) -> u8 {
        match (self, is_home) {
            (MatchResult::Draw, _) => 1,
            (MatchResult::HomeWin, true) | (MatchResult::AwayWin, false) => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::HomeWin => write!(f, "Home Win"),
            MatchResult::Draw => write!(f, "Draw"),
            MatchResult::AwayWin => write!(f, "Away Win"),
        }
    }
}

/// Decimal bookmaker odds for the three outcomes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl MatchOdds {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        MatchOdds { home, draw, away }
    }

    /// Odds quoted for a given outcome
    pub fn for_result(&self, result: MatchResult) -> f64 {
        match result {
            MatchResult::HomeWin => self.home,
            MatchResult::Draw => self.draw,
            MatchResult::AwayWin => self.away,
        }
    }
}

/// Expected goals for both sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
}

/// A single historical match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub season: Option<String>,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_goals: u8,
    pub away_goals: u8,
    pub result: MatchResult,
    pub odds: Option<MatchOdds>,
    pub expected_goals: Option<ExpectedGoals>,
    /// Extra numeric match-level signals (weather and the like)
    #[serde(default)]
    pub covariates: BTreeMap<String, f64>,
}

impl MatchRecord {
    /// Build a record whose result is derived from the score
    pub fn new(
        date: NaiveDate,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_goals: u8,
        away_goals: u8,
    ) -> Self {
        MatchRecord {
            date,
            season: None,
            home_team: TeamId(home_team.into()),
            away_team: TeamId(away_team.into()),
            home_goals,
            away_goals,
            result: MatchResult::from_goals(home_goals, away_goals),
            odds: None,
            expected_goals: None,
            covariates: BTreeMap::new(),
        }
    }

    pub fn with_odds(mut self, odds: MatchOdds) -> Self {
        self.odds = Some(odds);
        self
    }

    pub fn with_expected_goals(mut self, home: f64, away: f64) -> Self {
        self.expected_goals = Some(ExpectedGoals { home, away });
        self
    }

    /// Whether the stored result agrees with the scoreline
    pub fn is_consistent(&self) -> bool {
        self.result == MatchResult::from_goals(self.home_goals, self.away_goals)
    }

    pub fn involves(&self, team: &TeamId) -> bool {
        &self.home_team == team || &self.away_team == team
    }
}

/// Outcome probabilities for one match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl OutcomeProbabilities {
    pub fn uniform() -> Self {
        OutcomeProbabilities {
            home_win: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away_win: 1.0 / 3.0,
        }
    }

    /// Rescale so the three probabilities sum to one
    pub fn normalized(home_win: f64, draw: f64, away_win: f64) -> Self {
        let total = home_win + draw + away_win;
        if total <= 0.0 || !total.is_finite() {
            return Self::uniform();
        }
        OutcomeProbabilities {
            home_win: home_win / total,
            draw: draw / total,
            away_win: away_win / total,
        }
    }

    pub fn get(&self, result: MatchResult) -> f64 {
        match result {
            MatchResult::HomeWin => self.home_win,
            MatchResult::Draw => self.draw,
            MatchResult::AwayWin => self.away_win,
        }
    }

    /// Most likely outcome (ties resolve towards the home side)
    pub fn most_likely(&self) -> MatchResult {
        let mut best = MatchResult::HomeWin;
        for result in [MatchResult::Draw, MatchResult::AwayWin] {
            if self.get(result) > self.get(best) {
                best = result;
            }
        }
        best
    }
}

/// Model prediction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub probabilities: OutcomeProbabilities,
    pub outcome: MatchResult,
    pub odds: MatchOdds,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FootyError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Insufficient history for {team}: has {appearances} appearances, need {required}")]
    InsufficientHistory {
        team: String,
        appearances: usize,
        required: usize,
    },

    #[error("Ambiguous join: {team} has more than one {side} fixture on {date}")]
    JoinAmbiguity {
        date: NaiveDate,
        team: String,
        side: String,
    },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FootyError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub teams: TeamsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub cache_dir: String,
    pub features_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/footy.db".to_string(),
            cache_dir: "data/raw".to_string(),
            features_path: "data/features.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub league: String,
    pub seasons: Vec<String>,
    /// Extra numeric CSV columns carried through as match covariates
    #[serde(default)]
    pub covariates: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            base_url: "https://www.football-data.co.uk/mmz4281".to_string(),
            league: "E0".to_string(),
            seasons: ["2324", "2223", "2122", "2021", "1920"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            covariates: ["Rain", "Temperature", "WindSpeed"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Expected goals placed on the synthetic fixture when the table carries xG
    pub default_home_xg: f64,
    pub default_away_xg: f64,
    /// Odds used for the synthetic fixture when none are supplied
    pub default_odds: MatchOdds,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            default_home_xg: 1.5,
            default_away_xg: 1.0,
            default_odds: MatchOdds::new(2.0, 3.0, 4.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingConfig {
    pub initial_bankroll: f64,
    pub stake: f64,
    /// Required edge over the implied probability before a bet is placed
    pub value_threshold: f64,
}

impl Default for BettingConfig {
    fn default() -> Self {
        BettingConfig {
            initial_bankroll: 1000.0,
            stake: 10.0,
            value_threshold: 1.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Fraction of the chronologically ordered rows used for fitting
    pub train_fraction: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig { train_fraction: 0.8 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamsConfig {
    /// Alternative spelling -> canonical team name
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FootyError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FootyError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FootyError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_from_goals() {
        assert_eq!(MatchResult::from_goals(2, 1), MatchResult::HomeWin);
        assert_eq!(MatchResult::from_goals(0, 0), MatchResult::Draw);
        assert_eq!(MatchResult::from_goals(1, 3), MatchResult::AwayWin);
    }

    #[test]
    fn test_points_per_side() {
        assert_eq!(MatchResult::HomeWin.points(true), 3);
        assert_eq!(MatchResult::HomeWin.points(false), 0);
        assert_eq!(MatchResult::AwayWin.points(false), 3);
        assert_eq!(MatchResult::Draw.points(true), 1);
        assert_eq!(MatchResult::Draw.points(false), 1);
    }

    #[test]
    fn test_result_codes() {
        for result in MatchResult::ALL {
            assert_eq!(MatchResult::from_code(result.code()), Some(result));
            assert_eq!(MatchResult::from_label(result.label()), Some(result));
        }
        assert_eq!(MatchResult::from_code("x"), None);
    }

    #[test]
    fn test_consistency_check() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut record = MatchRecord::new(date, "Arsenal", "Chelsea", 2, 0);
        assert!(record.is_consistent());
        record.result = MatchResult::Draw;
        assert!(!record.is_consistent());
    }

    #[test]
    fn test_most_likely_outcome() {
        let probs = OutcomeProbabilities::normalized(1.0, 1.0, 2.0);
        assert_eq!(probs.most_likely(), MatchResult::AwayWin);
        assert!((probs.away_win - 0.5).abs() < 1e-12);
        assert_eq!(OutcomeProbabilities::uniform().most_likely(), MatchResult::HomeWin);
    }

    #[test]
    fn test_config_round_trip_through_toml() {
        let mut config = Config::default();
        config
            .teams
            .aliases
            .insert("Manchester United".to_string(), "Man United".to_string());
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.source.league, "E0");
        assert_eq!(parsed.teams.aliases["Manchester United"], "Man United");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[betting]\ninitial_bankroll = 500.0\nstake = 5.0\nvalue_threshold = 1.1\n").unwrap();
        assert_eq!(parsed.betting.stake, 5.0);
        assert_eq!(parsed.data.database_path, "data/footy.db");
    }
}
