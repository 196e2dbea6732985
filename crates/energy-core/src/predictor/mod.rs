//! ML prediction engine

mod features;
mod inference;
mod model;
mod onnx;

pub use features::{EncodedVector, FeatureEncoder, UnseenCategoryPolicy};
pub use inference::{InferenceStats, PredictionService};
pub use model::{ForestRegressor, LinearRegressor, RegressionTree, SerializedModel, TreeNode};
pub use onnx::OnnxRegressor;

use crate::error::InferenceError;

/// Trait for regression function implementations
pub trait Regressor: Send + Sync {
    /// Predict a single value from one row of aligned features
    fn predict(&self, features: &[f64]) -> Result<f64, InferenceError>;

    /// Number of input columns the function was fitted on
    fn n_features(&self) -> usize;

    /// Short name of the model family
    fn kind(&self) -> &'static str;
}
