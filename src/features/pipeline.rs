//! Feature table construction
//!
//! expand -> index -> rolling form -> reassemble -> trim. Every call starts
//! from the input table; nothing is cached between calls.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::appearance::expand;
use super::reassemble::{reassemble, MatchForm};
use super::rolling::{compute_form, AppearanceIndex, BaseForm, ExpectedGoalsForm};
use super::schema::{FeatureSchema, ODDS_COLUMNS};
use crate::{FootyError, MatchOdds, MatchRecord, MatchResult, Result, TeamId, FORM_WINDOW};

/// Form block for a table without expected goals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseFeatureRow {
    pub home: BaseForm,
    pub away: BaseForm,
}

/// Form block for a table with expected goals on every row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtendedFeatureRow {
    pub home: BaseForm,
    pub away: BaseForm,
    pub home_expected: ExpectedGoalsForm,
    pub away_expected: ExpectedGoalsForm,
}

/// Form features of one match, shaped by the run's schema
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeatureRow {
    Base(BaseFeatureRow),
    Extended(ExtendedFeatureRow),
}

impl FeatureRow {
    pub fn schema(&self) -> FeatureSchema {
        match self {
            FeatureRow::Base(_) => FeatureSchema::Base,
            FeatureRow::Extended(_) => FeatureSchema::Extended,
        }
    }

    pub fn home(&self) -> &BaseForm {
        match self {
            FeatureRow::Base(row) => &row.home,
            FeatureRow::Extended(row) => &row.home,
        }
    }

    pub fn away(&self) -> &BaseForm {
        match self {
            FeatureRow::Base(row) => &row.away,
            FeatureRow::Extended(row) => &row.away,
        }
    }

    /// Values in the order given by `FeatureSchema::columns`
    pub fn to_vec(&self) -> Vec<f64> {
        let mut values = self.home().to_vec();
        values.extend(self.away().to_vec());
        if let FeatureRow::Extended(row) = self {
            values.extend(row.home_expected.to_vec());
            values.extend(row.away_expected.to_vec());
        }
        values
    }
}

/// One match with its pre-match form for both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFeatureRow {
    /// Position of the match in the pipeline input
    pub source_index: usize,
    pub date: NaiveDate,
    pub season: Option<String>,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub result: MatchResult,
    pub odds: Option<MatchOdds>,
    pub covariates: BTreeMap<String, f64>,
    pub form: FeatureRow,
}

impl MatchFeatureRow {
    pub fn home_form_points(&self) -> u32 {
        self.form.home().points
    }

    pub fn away_form_points(&self) -> u32 {
        self.form.away().points
    }
}

/// Named numeric matrix handed to a classifier
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>) -> Self {
        FeatureMatrix {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Split into the first `at` rows and the rest
    pub fn split_at(&self, at: usize) -> (FeatureMatrix, FeatureMatrix) {
        let at = at.min(self.rows.len());
        (
            FeatureMatrix {
                columns: self.columns.clone(),
                rows: self.rows[..at].to_vec(),
            },
            FeatureMatrix {
                columns: self.columns.clone(),
                rows: self.rows[at..].to_vec(),
            },
        )
    }
}

/// Features plus labels, in chronological order
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub features: FeatureMatrix,
    pub labels: Vec<MatchResult>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Chronological split: the first `fraction` of rows for fitting
    pub fn split(&self, fraction: f64) -> (TrainingSet, TrainingSet) {
        let at = (self.len() as f64 * fraction.clamp(0.0, 1.0)) as usize;
        let (train_x, test_x) = self.features.split_at(at);
        (
            TrainingSet {
                features: train_x,
                labels: self.labels[..at].to_vec(),
            },
            TrainingSet {
                features: test_x,
                labels: self.labels[at..].to_vec(),
            },
        )
    }
}

/// Output of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    /// Number of matches fed into the pipeline
    pub input_rows: usize,
    pub rows: Vec<MatchFeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Matches dropped for lack of history
    pub fn dropped(&self) -> usize {
        self.input_rows - self.rows.len()
    }

    /// Row built from the input match at `index`, if it survived trimming
    pub fn find_source(&self, index: usize) -> Option<&MatchFeatureRow> {
        self.rows
            .binary_search_by_key(&index, |row| row.source_index)
            .ok()
            .map(|pos| &self.rows[pos])
    }

    /// Column names for `matrix`
    pub fn feature_names(&self, include_odds: bool) -> Vec<String> {
        let mut names: Vec<String> = self.schema.columns().iter().map(|c| c.to_string()).collect();
        if include_odds {
            names.extend(ODDS_COLUMNS.iter().map(|c| c.to_string()));
        }
        names
    }

    /// Build a classifier input; rows without odds are skipped when odds are requested
    pub fn matrix(&self, include_odds: bool) -> TrainingSet {
        let mut features = FeatureMatrix::new(self.feature_names(include_odds));
        let mut labels = Vec::with_capacity(self.rows.len());

        for row in &self.rows {
            let mut values = row.form.to_vec();
            if include_odds {
                let Some(odds) = row.odds else {
                    continue;
                };
                values.extend([odds.home, odds.draw, odds.away]);
            }
            features.rows.push(values);
            labels.push(row.result);
        }

        TrainingSet { features, labels }
    }

    /// Export as CSV: identifiers, label, form features, odds and covariates
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;

        let covariate_names: BTreeSet<&str> = self
            .rows
            .iter()
            .flat_map(|row| row.covariates.keys().map(String::as_str))
            .collect();

        let mut header = vec!["date", "season", "home_team", "away_team", "result"];
        header.extend(self.schema.columns());
        header.extend(ODDS_COLUMNS);
        header.extend(covariate_names.iter().copied());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![
                row.date.format("%Y-%m-%d").to_string(),
                row.season.clone().unwrap_or_default(),
                row.home_team.to_string(),
                row.away_team.to_string(),
                row.result.code().to_string(),
            ];
            record.extend(row.form.to_vec().iter().map(|v| v.to_string()));
            match row.odds {
                Some(odds) => record.extend([odds.home, odds.draw, odds.away].iter().map(|v| v.to_string())),
                None => record.extend(std::iter::repeat(String::new()).take(ODDS_COLUMNS.len())),
            }
            for name in &covariate_names {
                record.push(row.covariates.get(*name).map(|v| v.to_string()).unwrap_or_default());
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        log::info!("Wrote {} feature rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// Compute the feature table, resolving the schema from the data
pub fn compute_features(matches: &[MatchRecord]) -> Result<FeatureTable> {
    let schema = FeatureSchema::detect(matches)?;
    compute_features_with_schema(matches, schema)
}

/// Compute the feature table under an explicit schema
///
/// `Base` ignores any expected goals present; `Extended` requires them on
/// every row.
pub fn compute_features_with_schema(
    matches: &[MatchRecord],
    schema: FeatureSchema,
) -> Result<FeatureTable> {
    let appearances = expand(matches, schema)?;
    let index = AppearanceIndex::build(appearances);
    for team in index.teams() {
        let dates = index.same_day_appearances(team);
        if !dates.is_empty() {
            log::warn!(
                "{} plays more than once on {} date(s), first {}; input order decides window order",
                team,
                dates.len(),
                dates[0]
            );
        }
    }
    let snapshots = compute_form(&index, FORM_WINDOW, schema);
    let forms = reassemble(matches, index.appearances(), &snapshots)?;
    let rows = trim(matches, &forms, schema)?;

    log::debug!(
        "Feature table ({}): {} of {} matches have {} prior appearances for both sides",
        schema,
        rows.len(),
        matches.len(),
        FORM_WINDOW
    );

    Ok(FeatureTable {
        schema,
        input_rows: matches.len(),
        rows,
    })
}

/// Drop matches where either side lacks a full window
fn trim(
    matches: &[MatchRecord],
    forms: &[MatchForm],
    schema: FeatureSchema,
) -> Result<Vec<MatchFeatureRow>> {
    let mut rows = Vec::with_capacity(matches.len());

    for (source_index, (record, form)) in matches.iter().zip(forms).enumerate() {
        let (Some(home), Some(away)) = (form.home, form.away) else {
            continue;
        };

        let form = match schema {
            FeatureSchema::Base => FeatureRow::Base(BaseFeatureRow {
                home: home.base,
                away: away.base,
            }),
            FeatureSchema::Extended => match (home.expected, away.expected) {
                (Some(home_expected), Some(away_expected)) => {
                    FeatureRow::Extended(ExtendedFeatureRow {
                        home: home.base,
                        away: away.base,
                        home_expected,
                        away_expected,
                    })
                }
                _ => {
                    return Err(FootyError::Schema(format!(
                        "row {} lost its expected-goals form during aggregation",
                        source_index
                    )))
                }
            },
        };

        rows.push(MatchFeatureRow {
            source_index,
            date: record.date,
            season: record.season.clone(),
            home_team: record.home_team.clone(),
            away_team: record.away_team.clone(),
            result: record.result,
            odds: record.odds,
            covariates: record.covariates.clone(),
            form,
        });
    }

    Ok(rows)
}
