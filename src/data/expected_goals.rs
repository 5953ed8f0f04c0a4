//! Attach expected goals from a separate table
//!
//! The xG table is inner-joined on (date, home team). Matches without an xG
//! row are dropped, so the merged table carries the signal on every row.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::aliases::TeamAliases;
use super::csv_source::parse_date;
use crate::{ExpectedGoals, FootyError, MatchRecord, Result, TeamId};

/// One row of an expected-goals table
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedGoalsRow {
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_xg: f64,
    pub away_xg: f64,
}

#[derive(Debug, Deserialize)]
struct RawExpectedGoalsRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "HomeTeam", alias = "HomeTeam_Understat")]
    home_team: String,
    #[serde(rename = "AwayTeam", alias = "AwayTeam_Understat")]
    away_team: String,
    #[serde(rename = "Home_xG")]
    home_xg: f64,
    #[serde(rename = "Away_xG")]
    away_xg: f64,
}

/// Read an expected-goals table, normalizing team names
pub fn parse_expected_goals<R: Read>(reader: R, aliases: &TeamAliases) -> Result<Vec<ExpectedGoalsRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for raw in reader.deserialize::<RawExpectedGoalsRow>() {
        let raw = raw?;
        rows.push(ExpectedGoalsRow {
            date: parse_date(&raw.date)?,
            home_team: aliases.canonical(&raw.home_team),
            away_team: aliases.canonical(&raw.away_team),
            home_xg: raw.home_xg,
            away_xg: raw.away_xg,
        });
    }
    Ok(rows)
}

pub fn load_expected_goals<P: AsRef<Path>>(path: P, aliases: &TeamAliases) -> Result<Vec<ExpectedGoalsRow>> {
    let path = path.as_ref();
    let rows = parse_expected_goals(std::fs::File::open(path)?, aliases)?;
    log::info!("Parsed {} expected-goals rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Inner join on (date, home team); keeps the order of `matches`
pub fn merge_expected_goals(
    matches: Vec<MatchRecord>,
    xg_rows: &[ExpectedGoalsRow],
) -> Result<Vec<MatchRecord>> {
    let mut by_key: HashMap<(NaiveDate, &TeamId), &ExpectedGoalsRow> = HashMap::new();
    for row in xg_rows {
        if by_key.insert((row.date, &row.home_team), row).is_some() {
            return Err(FootyError::JoinAmbiguity {
                date: row.date,
                team: row.home_team.to_string(),
                side: "home".to_string(),
            });
        }
    }

    let total = matches.len();
    let merged: Vec<MatchRecord> = matches
        .into_iter()
        .filter_map(|mut record| {
            let row = by_key.get(&(record.date, &record.home_team))?;
            if row.away_team != record.away_team {
                log::warn!(
                    "xG row for {} on {} lists opponent {} but the result lists {}",
                    record.home_team,
                    record.date,
                    row.away_team,
                    record.away_team
                );
            }
            record.expected_goals = Some(ExpectedGoals {
                home: row.home_xg,
                away: row.away_xg,
            });
            Some(record)
        })
        .collect();

    log::info!("Merged {} matches out of {} with expected goals", merged.len(), total);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 9, day).unwrap()
    }

    #[test]
    fn test_parse_understat_layout() {
        let mut map = HashMap::new();
        map.insert("Manchester United".to_string(), "Man United".to_string());
        let data = "Date,HomeTeam_Understat,AwayTeam_Understat,Home_xG,Away_xG,Season\n\
                    2023-09-03,Manchester United,Arsenal,0.9,2.1,2023\n";
        let rows = parse_expected_goals(data.as_bytes(), &TeamAliases::new(&map)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_team.as_str(), "Man United");
        assert_eq!(rows[0].date, date(3));
        assert_eq!(rows[0].away_xg, 2.1);
    }

    #[test]
    fn test_merge_is_inner_join() {
        let matches = vec![
            MatchRecord::new(date(1), "A", "B", 1, 0),
            MatchRecord::new(date(2), "C", "D", 0, 0),
            MatchRecord::new(date(3), "B", "A", 2, 1),
        ];
        let xg = vec![
            ExpectedGoalsRow {
                date: date(3),
                home_team: TeamId::from("B"),
                away_team: TeamId::from("A"),
                home_xg: 1.7,
                away_xg: 0.6,
            },
            ExpectedGoalsRow {
                date: date(1),
                home_team: TeamId::from("A"),
                away_team: TeamId::from("B"),
                home_xg: 1.2,
                away_xg: 0.4,
            },
        ];

        let merged = merge_expected_goals(matches, &xg).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].home_team.as_str(), "A");
        assert_eq!(merged[0].expected_goals.unwrap().home, 1.2);
        assert_eq!(merged[1].expected_goals.unwrap().away, 0.6);
    }

    #[test]
    fn test_duplicate_xg_rows_rejected() {
        let row = ExpectedGoalsRow {
            date: date(1),
            home_team: TeamId::from("A"),
            away_team: TeamId::from("B"),
            home_xg: 1.0,
            away_xg: 1.0,
        };
        let err = merge_expected_goals(vec![], &[row.clone(), row]).unwrap_err();
        assert!(matches!(err, FootyError::JoinAmbiguity { .. }));
    }
}
