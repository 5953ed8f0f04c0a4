//! Prediction and inference
//!
//! Fit a classifier on stored history and predict upcoming fixtures.

pub mod inference;

pub use inference::{format_prediction, Predictor};
