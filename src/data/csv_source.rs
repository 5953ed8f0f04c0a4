//! football-data.co.uk style CSV parsing
//!
//! Required columns: Date, HomeTeam, AwayTeam, FTHG, FTAG. FTR, B365H/D/A,
//! Home_xG/Away_xG and Season are optional. Expected goals are all-or-nothing:
//! once the columns exist every played row must fill them.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use super::aliases::TeamAliases;
use crate::{ExpectedGoals, FootyError, MatchOdds, MatchRecord, MatchResult, Result};

const REQUIRED_COLUMNS: [&str; 5] = ["Date", "HomeTeam", "AwayTeam", "FTHG", "FTAG"];

#[derive(Debug, Deserialize)]
struct RawMatchRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "HomeTeam")]
    home_team: String,
    #[serde(rename = "AwayTeam")]
    away_team: String,
    #[serde(rename = "FTHG", default)]
    home_goals: Option<f64>,
    #[serde(rename = "FTAG", default)]
    away_goals: Option<f64>,
    #[serde(rename = "FTR", default)]
    result: Option<String>,
    #[serde(rename = "B365H", default)]
    odds_home: Option<f64>,
    #[serde(rename = "B365D", default)]
    odds_draw: Option<f64>,
    #[serde(rename = "B365A", default)]
    odds_away: Option<f64>,
    #[serde(rename = "Home_xG", default)]
    home_xg: Option<f64>,
    #[serde(rename = "Away_xG", default)]
    away_xg: Option<f64>,
    #[serde(rename = "Season", default)]
    season: Option<String>,
}

/// Options controlling how a CSV file maps onto match records
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    pub aliases: TeamAliases,
    /// Season tag used when the file has no Season column
    pub season: Option<String>,
    /// Numeric columns carried through as covariates
    pub covariates: Vec<String>,
}

/// Parse a date in any of the layouts football-data files have used
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    // Dates written back by dataframe tools may carry a time part
    let raw = raw.split_whitespace().next().unwrap_or(raw);

    let format = if raw.contains('-') {
        "%Y-%m-%d"
    } else if raw.rsplit('/').next().map_or(false, |year| year.len() == 2) {
        "%d/%m/%y"
    } else {
        "%d/%m/%Y"
    };

    NaiveDate::parse_from_str(raw, format)
        .map_err(|e| FootyError::Parse(format!("Invalid date '{}': {}", raw, e)))
}

fn parse_goals(value: f64, line: u64) -> Result<u8> {
    if value < 0.0 || value.fract() != 0.0 || value > u8::MAX as f64 {
        return Err(FootyError::Schema(format!(
            "line {}: invalid goal count {}",
            line, value
        )));
    }
    Ok(value as u8)
}

/// Read match records from a file
pub fn load_csv<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Vec<MatchRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let records = parse_csv(file, options)?;
    log::info!("Parsed {} matches from {}", records.len(), path.display());
    Ok(records)
}

/// Read match records from any CSV source, keeping file order
pub fn parse_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Vec<MatchRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let has = |name: &str| headers.iter().any(|h| h == name);

    let missing: Vec<&str> = REQUIRED_COLUMNS.iter().copied().filter(|c| !has(*c)).collect();
    if !missing.is_empty() {
        return Err(FootyError::Schema(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let xg_declared = match (has("Home_xG"), has("Away_xG")) {
        (true, true) => true,
        (false, false) => false,
        _ => {
            return Err(FootyError::Schema(
                "Home_xG and Away_xG must appear together".to_string(),
            ))
        }
    };

    let covariate_columns: Vec<(String, usize)> = options
        .covariates
        .iter()
        .filter_map(|name| {
            headers
                .iter()
                .position(|h| h == name.as_str())
                .map(|idx| (name.clone(), idx))
        })
        .collect();

    let mut matches = Vec::new();
    let mut skipped = 0usize;

    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line());
        let raw: RawMatchRow = row.deserialize(Some(&headers))?;

        if raw.date.is_empty() || raw.home_team.is_empty() || raw.away_team.is_empty() {
            skipped += 1;
            continue;
        }
        let (Some(home_goals), Some(away_goals)) = (raw.home_goals, raw.away_goals) else {
            log::debug!("line {}: no score for {} v {}, skipping", line, raw.home_team, raw.away_team);
            skipped += 1;
            continue;
        };

        let date = parse_date(&raw.date)?;
        let home_goals = parse_goals(home_goals, line)?;
        let away_goals = parse_goals(away_goals, line)?;
        let scored = MatchResult::from_goals(home_goals, away_goals);

        let result = match raw.result.as_deref().filter(|r| !r.is_empty()) {
            Some(code) => {
                let stated = MatchResult::from_code(code).ok_or_else(|| {
                    FootyError::Schema(format!("line {}: unknown result code '{}'", line, code))
                })?;
                if stated != scored {
                    return Err(FootyError::Schema(format!(
                        "line {}: result {} does not match score {}-{}",
                        line, code, home_goals, away_goals
                    )));
                }
                stated
            }
            None => scored,
        };

        let odds = match (raw.odds_home, raw.odds_draw, raw.odds_away) {
            (Some(home), Some(draw), Some(away)) => Some(MatchOdds { home, draw, away }),
            _ => None,
        };

        let expected_goals = if xg_declared {
            match (raw.home_xg, raw.away_xg) {
                (Some(home), Some(away)) if home >= 0.0 && away >= 0.0 => {
                    Some(ExpectedGoals { home, away })
                }
                _ => {
                    return Err(FootyError::Schema(format!(
                        "line {}: expected goals missing or negative for {} v {}",
                        line, raw.home_team, raw.away_team
                    )))
                }
            }
        } else {
            None
        };

        let mut covariates = BTreeMap::new();
        for (name, idx) in &covariate_columns {
            if let Some(value) = row.get(*idx).and_then(|v| v.parse::<f64>().ok()) {
                covariates.insert(name.clone(), value);
            }
        }

        matches.push(MatchRecord {
            date,
            season: raw
                .season
                .filter(|s| !s.is_empty())
                .or_else(|| options.season.clone()),
            home_team: options.aliases.canonical(&raw.home_team),
            away_team: options.aliases.canonical(&raw.away_team),
            home_goals,
            away_goals,
            result,
            odds,
            expected_goals,
            covariates,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {} rows without a date, teams or final score", skipped);
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = "\
Div,Date,Time,HomeTeam,AwayTeam,FTHG,FTAG,FTR,B365H,B365D,B365A
E0,11/08/2023,20:00,Burnley,Man City,0,3,A,8.00,5.50,1.33
E0,12/08/2023,12:30,Arsenal,Nott'm Forest,2,1,H,1.18,7.00,15.00
E0,12/08/23,15:00,Bournemouth,West Ham,1,1,D,2.60,3.40,2.70
E0,13/08/2023,14:00,Brentford,Tottenham,,,,2.90,3.60,2.35
,,,,,,,,,,
";

    #[test]
    fn test_parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2023, 8, 12).unwrap();
        assert_eq!(parse_date("12/08/2023").unwrap(), expected);
        assert_eq!(parse_date("12/08/23").unwrap(), expected);
        assert_eq!(parse_date("2023-08-12").unwrap(), expected);
        assert_eq!(parse_date("2023-08-12 00:00:00").unwrap(), expected);
        assert!(parse_date("not a date").is_err());
    }

    #[test]
    fn test_parse_football_data_csv() {
        let options = CsvOptions {
            season: Some("2324".to_string()),
            ..CsvOptions::default()
        };
        let matches = parse_csv(SAMPLE.as_bytes(), &options).unwrap();
        assert_eq!(matches.len(), 3);

        let first = &matches[0];
        assert_eq!(first.home_team.as_str(), "Burnley");
        assert_eq!(first.result, MatchResult::AwayWin);
        assert_eq!(first.odds.unwrap().away, 1.33);
        assert_eq!(first.season.as_deref(), Some("2324"));
        assert!(first.expected_goals.is_none());

        assert_eq!(matches[2].date, NaiveDate::from_ymd_opt(2023, 8, 12).unwrap());
        assert_eq!(matches[2].result, MatchResult::Draw);
    }

    #[test]
    fn test_aliases_applied() {
        let mut map = HashMap::new();
        map.insert("Man City".to_string(), "Manchester City".to_string());
        let options = CsvOptions {
            aliases: TeamAliases::new(&map),
            ..CsvOptions::default()
        };
        let matches = parse_csv(SAMPLE.as_bytes(), &options).unwrap();
        assert_eq!(matches[0].away_team.as_str(), "Manchester City");
    }

    #[test]
    fn test_missing_required_column() {
        let data = "Date,HomeTeam,AwayTeam,FTHG\n12/08/2023,A,B,1\n";
        let err = parse_csv(data.as_bytes(), &CsvOptions::default()).unwrap_err();
        match err {
            FootyError::Schema(msg) => assert!(msg.contains("FTAG")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_inconsistent_result_rejected() {
        let data = "Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR\n12/08/2023,A,B,1,0,A\n";
        let err = parse_csv(data.as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, FootyError::Schema(_)));
    }

    #[test]
    fn test_expected_goals_table_wide() {
        let full = "Date,HomeTeam,AwayTeam,FTHG,FTAG,Home_xG,Away_xG\n\
                    12/08/2023,A,B,1,0,1.4,0.3\n\
                    19/08/2023,B,A,2,2,1.1,1.9\n";
        let matches = parse_csv(full.as_bytes(), &CsvOptions::default()).unwrap();
        assert!(matches.iter().all(|m| m.expected_goals.is_some()));
        assert_eq!(matches[1].result, MatchResult::Draw);

        let gap = "Date,HomeTeam,AwayTeam,FTHG,FTAG,Home_xG,Away_xG\n\
                   12/08/2023,A,B,1,0,1.4,0.3\n\
                   19/08/2023,B,A,2,2,,\n";
        let err = parse_csv(gap.as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, FootyError::Schema(_)));
    }

    #[test]
    fn test_covariates_and_float_goals() {
        let data = "Date,HomeTeam,AwayTeam,FTHG,FTAG,Rain,Season\n\
                    2023-08-12,A,B,2.0,0.0,0.7,2324\n";
        let options = CsvOptions {
            covariates: vec!["Rain".to_string(), "WindSpeed".to_string()],
            ..CsvOptions::default()
        };
        let matches = parse_csv(data.as_bytes(), &options).unwrap();
        assert_eq!(matches[0].home_goals, 2);
        assert_eq!(matches[0].covariates.get("Rain"), Some(&0.7));
        assert!(!matches[0].covariates.contains_key("WindSpeed"));
        assert_eq!(matches[0].season.as_deref(), Some("2324"));
    }
}
