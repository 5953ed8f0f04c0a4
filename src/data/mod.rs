//! Data ingestion and storage
//!
//! CSV parsing, expected-goals merging, season downloads and SQLite storage.

pub mod aliases;
pub mod csv_source;
pub mod database;
pub mod download;
pub mod expected_goals;

pub use aliases::TeamAliases;
pub use csv_source::{load_csv, parse_csv, CsvOptions};
pub use database::{Database, DatabaseStats};
pub use download::SeasonDownloader;
pub use expected_goals::{load_expected_goals, merge_expected_goals, ExpectedGoalsRow};

use crate::{Config, MatchRecord};

/// CSV options derived from the application config
pub fn csv_options(config: &Config) -> CsvOptions {
    CsvOptions {
        aliases: TeamAliases::new(&config.teams.aliases),
        season: None,
        covariates: config.source.covariates.clone(),
    }
}

/// Keep only matches from the given season, if one is set
pub fn filter_season(matches: Vec<MatchRecord>, season: Option<&str>) -> Vec<MatchRecord> {
    match season {
        Some(season) => matches
            .into_iter()
            .filter(|m| m.season.as_deref() == Some(season))
            .collect(),
        None => matches,
    }
}
