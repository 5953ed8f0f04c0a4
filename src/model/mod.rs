//! Outcome classifiers
//!
//! Any model consuming the feature matrix plugs in through
//! [`OutcomeClassifier`]. Three non-learning baselines ship with the crate:
//! - Empirical: smoothed class frequencies from the fitting rows
//! - Form: smoothed class frequencies per points-form gap
//! - Market: normalized inverse bookmaker odds

pub mod baseline;

pub use baseline::{EmpiricalClassifier, FormClassifier, MarketImpliedClassifier};

use crate::features::FeatureMatrix;
use crate::{MatchResult, OutcomeProbabilities, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A three-way match outcome classifier
pub trait OutcomeClassifier {
    fn name(&self) -> &'static str;

    /// Whether the classifier expects the odds columns in its input
    fn uses_odds(&self) -> bool;

    fn fit(&mut self, features: &FeatureMatrix, labels: &[MatchResult]) -> Result<()>;

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<OutcomeProbabilities>>;

    /// Most likely outcome per row
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<MatchResult>> {
        Ok(self
            .predict_proba(features)?
            .iter()
            .map(OutcomeProbabilities::most_likely)
            .collect())
    }
}

/// Which baseline to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Empirical,
    Form,
    Market,
}

impl ModelKind {
    pub fn build(&self) -> Box<dyn OutcomeClassifier> {
        match self {
            ModelKind::Empirical => Box::new(EmpiricalClassifier::default()),
            ModelKind::Form => Box::new(FormClassifier::default()),
            ModelKind::Market => Box::new(MarketImpliedClassifier::default()),
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empirical" | "prior" => Ok(ModelKind::Empirical),
            "form" => Ok(ModelKind::Form),
            "market" | "odds" => Ok(ModelKind::Market),
            other => Err(format!("unknown model '{}', expected empirical, form or market", other)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Empirical => write!(f, "empirical"),
            ModelKind::Form => write!(f, "form"),
            ModelKind::Market => write!(f, "market"),
        }
    }
}
