//! Non-learning baseline classifiers

use crate::features::schema::{BASE_COLUMNS, ODDS_COLUMNS};
use crate::features::FeatureMatrix;
use crate::{FootyError, MatchResult, OutcomeProbabilities, Result};

use super::OutcomeClassifier;

/// Predicts the (Laplace-smoothed) outcome frequencies seen during fitting
#[derive(Debug, Clone)]
pub struct EmpiricalClassifier {
    probabilities: OutcomeProbabilities,
}

impl Default for EmpiricalClassifier {
    fn default() -> Self {
        EmpiricalClassifier {
            probabilities: OutcomeProbabilities::uniform(),
        }
    }
}

impl EmpiricalClassifier {
    pub fn probabilities(&self) -> OutcomeProbabilities {
        self.probabilities
    }
}

impl OutcomeClassifier for EmpiricalClassifier {
    fn name(&self) -> &'static str {
        "empirical"
    }

    fn uses_odds(&self) -> bool {
        false
    }

    fn fit(&mut self, _features: &FeatureMatrix, labels: &[MatchResult]) -> Result<()> {
        let mut counts = [1.0f64; 3];
        for label in labels {
            counts[label.label()] += 1.0;
        }
        self.probabilities = OutcomeProbabilities::normalized(counts[0], counts[1], counts[2]);
        log::debug!(
            "Empirical prior from {} rows: H {:.3} D {:.3} A {:.3}",
            labels.len(),
            self.probabilities.home_win,
            self.probabilities.draw,
            self.probabilities.away_win
        );
        Ok(())
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<OutcomeProbabilities>> {
        Ok(vec![self.probabilities; features.len()])
    }
}

/// Points-form gap between the sides, in buckets of this many points
const FORM_BUCKET_WIDTH: usize = 3;
/// Largest possible gap: a full window of wins against a full window of losses
const MAX_FORM_GAP: usize = 3 * crate::FORM_WINDOW;
const FORM_BUCKETS: usize = 2 * MAX_FORM_GAP / FORM_BUCKET_WIDTH + 1;

/// Outcome frequencies conditioned on the home-minus-away points form
///
/// Each bucket starts from one pseudo-count per outcome, so a gap never seen
/// in fitting predicts close to uniform.
#[derive(Debug, Clone)]
pub struct FormClassifier {
    counts: Vec<[f64; 3]>,
}

impl Default for FormClassifier {
    fn default() -> Self {
        FormClassifier {
            counts: vec![[1.0; 3]; FORM_BUCKETS],
        }
    }
}

impl FormClassifier {
    fn points_indices(features: &FeatureMatrix) -> Result<(usize, usize)> {
        let index = |name: &str| {
            features
                .column_index(name)
                .ok_or_else(|| FootyError::Schema(format!("form model needs the {} column", name)))
        };
        Ok((index(BASE_COLUMNS[0])?, index(BASE_COLUMNS[3])?))
    }

    fn bucket(gap: f64) -> usize {
        let max = MAX_FORM_GAP as f64;
        let shifted = (gap.clamp(-max, max) + max) / FORM_BUCKET_WIDTH as f64;
        (shifted.round() as usize).min(FORM_BUCKETS - 1)
    }
}

impl OutcomeClassifier for FormClassifier {
    fn name(&self) -> &'static str {
        "form"
    }

    fn uses_odds(&self) -> bool {
        false
    }

    fn fit(&mut self, features: &FeatureMatrix, labels: &[MatchResult]) -> Result<()> {
        let (home, away) = Self::points_indices(features)?;
        *self = FormClassifier::default();
        for (row, label) in features.rows.iter().zip(labels) {
            self.counts[Self::bucket(row[home] - row[away])][label.label()] += 1.0;
        }
        log::debug!("Form model fitted on {} rows", labels.len().min(features.len()));
        Ok(())
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<OutcomeProbabilities>> {
        let (home, away) = Self::points_indices(features)?;
        Ok(features
            .rows
            .iter()
            .map(|row| {
                let [h, d, a] = self.counts[Self::bucket(row[home] - row[away])];
                OutcomeProbabilities::normalized(h, d, a)
            })
            .collect())
    }
}

/// Reads the bookmaker's view straight off the odds columns
///
/// Inverse odds are normalized to strip the overround.
#[derive(Debug, Clone, Default)]
pub struct MarketImpliedClassifier;

impl MarketImpliedClassifier {
    fn odds_indices(features: &FeatureMatrix) -> Result<[usize; 3]> {
        let mut indices = [0usize; 3];
        for (slot, name) in indices.iter_mut().zip(ODDS_COLUMNS) {
            *slot = features.column_index(name).ok_or_else(|| {
                FootyError::Schema(format!("market model needs the {} column", name))
            })?;
        }
        Ok(indices)
    }
}

impl OutcomeClassifier for MarketImpliedClassifier {
    fn name(&self) -> &'static str {
        "market"
    }

    fn uses_odds(&self) -> bool {
        true
    }

    fn fit(&mut self, features: &FeatureMatrix, _labels: &[MatchResult]) -> Result<()> {
        Self::odds_indices(features).map(|_| ())
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<OutcomeProbabilities>> {
        let [h, d, a] = Self::odds_indices(features)?;
        Ok(features
            .rows
            .iter()
            .map(|row| {
                let inverse = |odds: f64| if odds > 0.0 { 1.0 / odds } else { 0.0 };
                OutcomeProbabilities::normalized(inverse(row[h]), inverse(row[d]), inverse(row[a]))
            })
            .collect())
    }
}
