//! Regressors persisted as JSON
//!
//! Two shapes are supported: a linear model and a forest of binary
//! regression trees whose leaf values are averaged, the layout a
//! random-forest trainer exports. Splits send a sample left when
//! `x[feature] <= threshold`.

use super::Regressor;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

/// A regressor as stored on disk, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedModel {
    Linear(LinearRegressor),
    Forest(ForestRegressor),
}

impl SerializedModel {
    /// Check internal consistency so prediction never indexes out of range
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SerializedModel::Linear(m) => {
                if m.coefficients.is_empty() {
                    return Err("linear model has no coefficients".to_string());
                }
                if !m.intercept.is_finite() || m.coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("linear model has non-finite parameters".to_string());
                }
                Ok(())
            }
            SerializedModel::Forest(m) => m.validate(),
        }
    }

    pub fn into_regressor(self) -> Box<dyn Regressor> {
        match self {
            SerializedModel::Linear(m) => Box::new(m),
            SerializedModel::Forest(m) => Box::new(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, InferenceError> {
        check_width(self.coefficients.len(), features)?;
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

/// Node of a regression tree, addressed by index within its tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Walk from the root to a leaf
    ///
    /// Trees built in code skip `validate`, so bad indices and cycles are
    /// reported as errors here instead of panicking.
    fn evaluate(&self, features: &[f64]) -> Result<f64, InferenceError> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(idx).ok_or_else(|| {
                InferenceError::Backend(format!("tree references missing node {}", idx))
            })?;
            match node {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).ok_or_else(|| {
                        InferenceError::Backend(format!(
                            "node {} splits on feature {} of {}",
                            idx,
                            feature,
                            features.len()
                        ))
                    })?;
                    idx = if *x <= *threshold { *left } else { *right };
                }
            }
        }
        Err(InferenceError::Backend(
            "tree walk did not reach a leaf".to_string(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestRegressor {
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl ForestRegressor {
    fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("forest declares zero features".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {} has no nodes", t));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Leaf { value } if !value.is_finite() => {
                        return Err(format!("tree {} node {} has a non-finite value", t, i));
                    }
                    TreeNode::Leaf { .. } => {}
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= self.n_features {
                            return Err(format!(
                                "tree {} node {} splits on feature {} of {}",
                                t, i, feature, self.n_features
                            ));
                        }
                        if threshold.is_nan() {
                            return Err(format!("tree {} node {} has a NaN threshold", t, i));
                        }
                        // Children strictly after the parent rules out cycles
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(format!(
                                    "tree {} node {} has invalid child {}",
                                    t, i, child
                                ));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Regressor for ForestRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, InferenceError> {
        check_width(self.n_features, features)?;
        if self.trees.is_empty() {
            return Err(InferenceError::Backend("forest has no trees".to_string()));
        }
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(features)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "forest"
    }
}

fn check_width(expected: usize, features: &[f64]) -> Result<(), InferenceError> {
    if features.len() != expected {
        return Err(InferenceError::ShapeMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}
