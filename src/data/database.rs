//! SQLite storage for match results

use crate::{ExpectedGoals, FootyError, MatchOdds, MatchRecord, MatchResult, Result, TeamId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

const MATCH_COLUMNS: &str = "date, season, home_team, away_team, home_goals, away_goals, result,
     odds_home, odds_draw, odds_away, home_xg, away_xg, covariates";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                season TEXT,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_goals INTEGER NOT NULL,
                away_goals INTEGER NOT NULL,
                result TEXT NOT NULL,
                odds_home REAL,
                odds_draw REAL,
                odds_away REAL,
                home_xg REAL,
                away_xg REAL,
                covariates TEXT NOT NULL DEFAULT '{}',
                UNIQUE(date, home_team, away_team)
            );

            CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);
            CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
            "#,
        )?;
        Ok(())
    }

    /// Insert or update a match record
    ///
    /// Re-importing a fixture overwrites the score but never erases odds,
    /// expected goals or season already on file.
    pub fn upsert_match(&self, record: &MatchRecord) -> Result<()> {
        upsert_on(&self.conn, record)
    }

    /// Insert multiple match records in one transaction
    pub fn upsert_matches(&mut self, records: &[MatchRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for record in records {
            upsert_on(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// All matches, chronological with insertion order breaking ties
    pub fn get_all_matches(&self) -> Result<Vec<MatchRecord>> {
        let query = format!("SELECT {} FROM matches ORDER BY date, id", MATCH_COLUMNS);
        let mut stmt = self.conn.prepare(&query)?;
        let matches = stmt
            .query_map([], Self::row_to_match)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    /// Matches from one season
    pub fn get_season_matches(&self, season: &str) -> Result<Vec<MatchRecord>> {
        let query = format!(
            "SELECT {} FROM matches WHERE season = ?1 ORDER BY date, id",
            MATCH_COLUMNS
        );
        let mut stmt = self.conn.prepare(&query)?;
        let matches = stmt
            .query_map(params![season], Self::row_to_match)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
        let date_str: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let home_goals: u8 = row.get(4)?;
        let away_goals: u8 = row.get(5)?;
        let result_code: String = row.get(6)?;
        let result = MatchResult::from_code(&result_code).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("unknown result code '{}'", result_code).into(),
            )
        })?;

        let odds = match (
            row.get::<_, Option<f64>>(7)?,
            row.get::<_, Option<f64>>(8)?,
            row.get::<_, Option<f64>>(9)?,
        ) {
            (Some(home), Some(draw), Some(away)) => Some(MatchOdds { home, draw, away }),
            _ => None,
        };

        let expected_goals = match (row.get::<_, Option<f64>>(10)?, row.get::<_, Option<f64>>(11)?)
        {
            (Some(home), Some(away)) => Some(ExpectedGoals { home, away }),
            _ => None,
        };

        let covariates_json: String = row.get(12)?;
        let covariates: BTreeMap<String, f64> = serde_json::from_str(&covariates_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(MatchRecord {
            date,
            season: row.get(1)?,
            home_team: TeamId(row.get(2)?),
            away_team: TeamId(row.get(3)?),
            home_goals,
            away_goals,
            result,
            odds,
            expected_goals,
            covariates,
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let team_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT home_team FROM matches UNION SELECT away_team FROM matches)",
            [],
            |row| row.get(0),
        )?;

        let match_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;

        let xg_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM matches WHERE home_xg IS NOT NULL AND away_xg IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(date) FROM matches", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(date) FROM matches", [], |row| row.get(0))
            .optional()?
            .flatten();

        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT season FROM matches WHERE season IS NOT NULL ORDER BY season")?;
        let seasons = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(DatabaseStats {
            team_count: team_count as usize,
            match_count: match_count as usize,
            expected_goals_count: xg_count as usize,
            seasons,
            earliest_match: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_match: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

fn upsert_on(conn: &Connection, record: &MatchRecord) -> Result<()> {
    let covariates =
        serde_json::to_string(&record.covariates).map_err(|e| FootyError::Parse(e.to_string()))?;
    conn.execute(
        r#"
        INSERT INTO matches (date, season, home_team, away_team, home_goals, away_goals,
                             result, odds_home, odds_draw, odds_away, home_xg, away_xg,
                             covariates)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(date, home_team, away_team) DO UPDATE SET
            season = COALESCE(excluded.season, season),
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            result = excluded.result,
            odds_home = COALESCE(excluded.odds_home, odds_home),
            odds_draw = COALESCE(excluded.odds_draw, odds_draw),
            odds_away = COALESCE(excluded.odds_away, odds_away),
            home_xg = COALESCE(excluded.home_xg, home_xg),
            away_xg = COALESCE(excluded.away_xg, away_xg),
            covariates = CASE WHEN excluded.covariates = '{}' THEN covariates
                              ELSE excluded.covariates END
        "#,
        params![
            record.date.format("%Y-%m-%d").to_string(),
            record.season,
            record.home_team.as_str(),
            record.away_team.as_str(),
            record.home_goals,
            record.away_goals,
            record.result.code(),
            record.odds.map(|o| o.home),
            record.odds.map(|o| o.draw),
            record.odds.map(|o| o.away),
            record.expected_goals.map(|x| x.home),
            record.expected_goals.map(|x| x.away),
            covariates,
        ],
    )?;
    Ok(())
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub match_count: usize,
    pub expected_goals_count: usize,
    pub seasons: Vec<String>,
    pub earliest_match: Option<NaiveDate>,
    pub latest_match: Option<NaiveDate>,
}
