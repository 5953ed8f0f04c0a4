//! Feature schema resolution
//!
//! The expected-goals block is present only when every input row carries the
//! signal. The decision is made once per pipeline run.

use serde::{Deserialize, Serialize};

use crate::{FootyError, MatchRecord, Result};

/// Columns every feature row carries
pub const BASE_COLUMNS: [&str; 6] = [
    "home_form_points",
    "home_form_goals_for",
    "home_form_goals_against",
    "away_form_points",
    "away_form_goals_for",
    "away_form_goals_against",
];

/// Columns appended when expected goals are available table-wide
pub const EXPECTED_GOALS_COLUMNS: [&str; 8] = [
    "home_form_xg_for",
    "home_form_xg_against",
    "home_form_perf_diff_for",
    "home_form_perf_diff_against",
    "away_form_xg_for",
    "away_form_xg_against",
    "away_form_perf_diff_for",
    "away_form_perf_diff_against",
];

/// Market columns, appended on request
pub const ODDS_COLUMNS: [&str; 3] = ["odds_home", "odds_draw", "odds_away"];

/// Which feature block a pipeline run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureSchema {
    /// Points and goals form only
    Base,
    /// Base block plus expected-goals form
    Extended,
}

impl FeatureSchema {
    /// Resolve the schema from the data: all rows with xG, or none
    pub fn detect(matches: &[MatchRecord]) -> Result<Self> {
        let with_xg = matches
            .iter()
            .filter(|m| m.expected_goals.is_some())
            .count();

        if with_xg == 0 {
            Ok(FeatureSchema::Base)
        } else if with_xg == matches.len() {
            Ok(FeatureSchema::Extended)
        } else {
            Err(FootyError::Schema(format!(
                "expected goals present on {} of {} rows; the signal must cover the whole table",
                with_xg,
                matches.len()
            )))
        }
    }

    /// `Base` when expected goals are to be ignored, otherwise [`detect`](Self::detect)
    pub fn resolve(matches: &[MatchRecord], base_only: bool) -> Result<Self> {
        if base_only {
            Ok(FeatureSchema::Base)
        } else {
            Self::detect(matches)
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, FeatureSchema::Extended)
    }

    /// Form column names in feature-vector order
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = BASE_COLUMNS.to_vec();
        if self.is_extended() {
            columns.extend_from_slice(&EXPECTED_GOALS_COLUMNS);
        }
        columns
    }

    /// Number of form features
    pub fn dim(&self) -> usize {
        match self {
            FeatureSchema::Base => BASE_COLUMNS.len(),
            FeatureSchema::Extended => BASE_COLUMNS.len() + EXPECTED_GOALS_COLUMNS.len(),
        }
    }
}

impl std::fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureSchema::Base => write!(f, "base"),
            FeatureSchema::Extended => write!(f, "extended (xG)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32) -> MatchRecord {
        MatchRecord::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), "A", "B", 1, 0)
    }

    #[test]
    fn test_detect_base() {
        let matches = vec![record(1), record(2)];
        assert_eq!(FeatureSchema::detect(&matches).unwrap(), FeatureSchema::Base);
    }

    #[test]
    fn test_detect_extended() {
        let matches = vec![
            record(1).with_expected_goals(1.2, 0.4),
            record(2).with_expected_goals(0.9, 0.9),
        ];
        assert_eq!(FeatureSchema::detect(&matches).unwrap(), FeatureSchema::Extended);
    }

    #[test]
    fn test_detect_mixed_is_schema_error() {
        let matches = vec![record(1).with_expected_goals(1.2, 0.4), record(2)];
        assert!(matches!(
            FeatureSchema::detect(&matches),
            Err(FootyError::Schema(_))
        ));
    }

    #[test]
    fn test_resolve_base_only_ignores_coverage() {
        let matches = vec![record(1).with_expected_goals(1.2, 0.4), record(2)];
        assert_eq!(FeatureSchema::resolve(&matches, true).unwrap(), FeatureSchema::Base);
        assert!(FeatureSchema::resolve(&matches, false).is_err());
    }

    #[test]
    fn test_empty_table_is_base() {
        assert_eq!(FeatureSchema::detect(&[]).unwrap(), FeatureSchema::Base);
    }

    #[test]
    fn test_columns() {
        assert_eq!(FeatureSchema::Base.columns().len(), FeatureSchema::Base.dim());
        assert_eq!(FeatureSchema::Extended.columns().len(), 14);
        assert!(!FeatureSchema::Base
            .columns()
            .iter()
            .any(|c| c.contains("xg") || c.contains("perf_diff")));
    }
}
