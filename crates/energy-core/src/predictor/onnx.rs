//! ONNX inference using tract
//!
//! Runs regressors exported to ONNX (for example a random forest converted
//! from the training framework). The graph takes one `[1, n_features]` f32
//! row and its first output holds the predicted value.

use super::Regressor;
use crate::error::InferenceError;
use anyhow::{Context, Result};
use tract_onnx::prelude::*;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based regressor using tract for lightweight inference
pub struct OnnxRegressor {
    model: TractModel,
    n_features: usize,
}

impl OnnxRegressor {
    /// Parse and optimize a model whose input is fixed to `n_features` columns
    pub fn from_bytes(model_bytes: &[u8], n_features: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model, n_features })
    }

    fn to_tensor(&self, features: &[f64]) -> Result<Tensor, InferenceError> {
        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        tract_ndarray::Array2::from_shape_vec((1, self.n_features), data)
            .map(Into::into)
            .map_err(|e| InferenceError::Backend(e.to_string()))
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let input = self.to_tensor(features)?;
        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Backend(format!("{:#}", e)))?;
        let output = result
            .first()
            .ok_or_else(|| InferenceError::Backend("No output from model".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Backend(format!("{:#}", e)))?;

        view.iter()
            .next()
            .map(|v| *v as f64)
            .ok_or_else(|| InferenceError::Backend("Model output is empty".to_string()))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage_bytes() {
        assert!(OnnxRegressor::from_bytes(b"not an onnx graph", 5).is_err());
    }
}
