//! Feature extraction
//!
//! Converts the match table into leakage-free rolling form features.

pub mod appearance;
pub mod league_table;
pub mod pipeline;
pub mod reassemble;
pub mod rolling;
pub mod schema;

pub use appearance::TeamAppearance;
pub use league_table::{league_table, Standing};
pub use pipeline::{
    compute_features, compute_features_with_schema, FeatureMatrix, FeatureRow, FeatureTable,
    MatchFeatureRow, TrainingSet,
};
pub use rolling::{BaseForm, ExpectedGoalsForm, FormSnapshot};
pub use schema::FeatureSchema;
