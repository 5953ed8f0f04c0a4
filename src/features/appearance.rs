//! Team-perspective expansion
//!
//! Every match becomes two appearances, one seen from each side, so that
//! "for" and "against" mean the same thing regardless of venue.

use chrono::NaiveDate;

use super::schema::FeatureSchema;
use crate::{FootyError, MatchRecord, Result, TeamId};

/// Expected-goals view of one appearance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppearanceExpectedGoals {
    pub xg_for: f64,
    pub xg_against: f64,
    /// goals_for - xg_for (positive = finishing above expectation)
    pub perf_diff_for: f64,
    /// goals_against - xg_against (positive = conceding above expectation)
    pub perf_diff_against: f64,
}

impl AppearanceExpectedGoals {
    /// Attach the goals-minus-expected differentials to a pair of xG values
    pub fn derive(goals_for: u8, goals_against: u8, xg_for: f64, xg_against: f64) -> Self {
        AppearanceExpectedGoals {
            xg_for,
            xg_against,
            perf_diff_for: goals_for as f64 - xg_for,
            perf_diff_against: goals_against as f64 - xg_against,
        }
    }
}

/// One team's participation in one match
#[derive(Debug, Clone, PartialEq)]
pub struct TeamAppearance {
    /// Position of the source match in the input table
    pub match_index: usize,
    pub date: NaiveDate,
    pub team: TeamId,
    pub opponent: TeamId,
    pub goals_for: u8,
    pub goals_against: u8,
    /// 3 for a win, 1 for a draw, 0 for a loss
    pub points: u8,
    pub is_home: bool,
    pub expected: Option<AppearanceExpectedGoals>,
}

/// Expand N matches into 2N appearances (home then away, in input order)
pub fn expand(matches: &[MatchRecord], schema: FeatureSchema) -> Result<Vec<TeamAppearance>> {
    let mut appearances = Vec::with_capacity(matches.len() * 2);

    for (index, record) in matches.iter().enumerate() {
        if !record.is_consistent() {
            return Err(FootyError::Schema(format!(
                "row {} ({} {} v {}): result {} does not match score {}-{}",
                index,
                record.date,
                record.home_team,
                record.away_team,
                record.result.code(),
                record.home_goals,
                record.away_goals
            )));
        }

        let xg = match schema {
            FeatureSchema::Base => None,
            FeatureSchema::Extended => Some(record.expected_goals.ok_or_else(|| {
                FootyError::Schema(format!(
                    "row {} ({} {} v {}) has no expected goals but the table declares them",
                    index, record.date, record.home_team, record.away_team
                ))
            })?),
        };

        appearances.push(TeamAppearance {
            match_index: index,
            date: record.date,
            team: record.home_team.clone(),
            opponent: record.away_team.clone(),
            goals_for: record.home_goals,
            goals_against: record.away_goals,
            points: record.result.points(true),
            is_home: true,
            expected: xg.map(|xg| {
                AppearanceExpectedGoals::derive(record.home_goals, record.away_goals, xg.home, xg.away)
            }),
        });

        appearances.push(TeamAppearance {
            match_index: index,
            date: record.date,
            team: record.away_team.clone(),
            opponent: record.home_team.clone(),
            goals_for: record.away_goals,
            goals_against: record.home_goals,
            points: record.result.points(false),
            is_home: false,
            expected: xg.map(|xg| {
                AppearanceExpectedGoals::derive(record.away_goals, record.home_goals, xg.away, xg.home)
            }),
        });
    }

    Ok(appearances)
}
