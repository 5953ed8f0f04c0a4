//! Classification metrics for three-way outcome predictions

use serde::Serialize;
use std::fmt;

use crate::{MatchResult, OutcomeProbabilities};

/// Probabilities are clipped to [EPS, 1 - EPS] before taking logs
const EPS: f64 = 1e-15;

/// Precision, recall and F1 for one outcome class
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true instances of the class
    pub support: usize,
}

/// Metrics over a set of predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub total: usize,
    pub correct: usize,
    pub log_loss: f64,
    /// `confusion[actual][predicted]`, indexed by class label
    pub confusion: [[usize; 3]; 3],
    pub per_class: [ClassMetrics; 3],
}

impl ClassificationReport {
    pub fn from_predictions(probabilities: &[OutcomeProbabilities], actual: &[MatchResult]) -> Self {
        let total = probabilities.len().min(actual.len());
        let mut confusion = [[0usize; 3]; 3];
        let mut loss_sum = 0.0;

        for (probs, outcome) in probabilities.iter().zip(actual) {
            let predicted = probs.most_likely();
            confusion[outcome.label()][predicted.label()] += 1;
            loss_sum += log_loss_term(probs, *outcome);
        }

        let correct = (0..3).map(|i| confusion[i][i]).sum();
        let per_class = [0, 1, 2].map(|class| class_metrics(&confusion, class));

        ClassificationReport {
            total,
            correct,
            log_loss: if total == 0 { 0.0 } else { loss_sum / total as f64 },
            confusion,
            per_class,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    pub fn class(&self, result: MatchResult) -> &ClassMetrics {
        &self.per_class[result.label()]
    }

    /// Unweighted mean F1 across classes
    pub fn macro_f1(&self) -> f64 {
        self.per_class.iter().map(|c| c.f1).sum::<f64>() / 3.0
    }
}

/// Normalized and clipped negative log likelihood of the true outcome
fn log_loss_term(probs: &OutcomeProbabilities, outcome: MatchResult) -> f64 {
    let clip = |p: f64| p.clamp(EPS, 1.0 - EPS);
    let total = clip(probs.home_win) + clip(probs.draw) + clip(probs.away_win);
    -(clip(probs.get(outcome)) / total).ln()
}

fn class_metrics(confusion: &[[usize; 3]; 3], class: usize) -> ClassMetrics {
    let tp = confusion[class][class] as f64;
    let predicted: usize = (0..3).map(|actual| confusion[actual][class]).sum();
    let support: usize = confusion[class].iter().sum();

    let precision = if predicted == 0 { 0.0 } else { tp / predicted as f64 };
    let recall = if support == 0 { 0.0 } else { tp / support as f64 };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Accuracy: {:.2}% ({}/{}) | Log loss: {:.4}",
            self.accuracy() * 100.0,
            self.correct,
            self.total,
            self.log_loss
        )?;
        writeln!(f, "{:<10} {:>9} {:>7} {:>7} {:>8}", "", "precision", "recall", "f1", "support")?;
        for result in MatchResult::ALL {
            let c = self.class(result);
            writeln!(
                f,
                "{:<10} {:>9.2} {:>7.2} {:>7.2} {:>8}",
                result.to_string(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f, "Macro F1: {:.4}", self.macro_f1())
    }
}
