//! Shared fixtures for unit tests

use crate::artifact::ArtifactPaths;
use crate::predictor::{ForestRegressor, LinearRegressor, RegressionTree, SerializedModel, TreeNode};
use crate::schema::FeatureSchema;
use std::path::Path;

pub const TRAINING_COLUMNS: [&str; 5] = [
    "Hour",
    "Temperature",
    "Machine_Status_Off",
    "Machine_Status_Idle",
    "Machine_Status_Running",
];

pub fn training_schema() -> FeatureSchema {
    FeatureSchema::from_names(TRAINING_COLUMNS).unwrap()
}

/// 50 kWh base, 3 kWh per degree, +30 idle, +150 running
pub fn linear_model() -> SerializedModel {
    SerializedModel::Linear(LinearRegressor {
        intercept: 50.0,
        coefficients: vec![0.0, 3.0, 0.0, 30.0, 150.0],
    })
}

/// Two trees splitting on the Running then Idle indicators
pub fn forest_model() -> SerializedModel {
    let tree = |off: f64, idle: f64, running: f64| RegressionTree {
        nodes: vec![
            TreeNode::Split {
                feature: 4,
                threshold: 0.5,
                left: 1,
                right: 4,
            },
            TreeNode::Split {
                feature: 3,
                threshold: 0.5,
                left: 2,
                right: 3,
            },
            TreeNode::Leaf { value: off },
            TreeNode::Leaf { value: idle },
            TreeNode::Leaf { value: running },
        ],
    };
    SerializedModel::Forest(ForestRegressor {
        n_features: 5,
        trees: vec![tree(50.0, 80.0, 200.0), tree(60.0, 90.0, 210.0)],
    })
}

/// Persist `model` and the training columns under `dir`
pub fn write_artifacts(dir: &Path, model: &SerializedModel) -> ArtifactPaths {
    let paths = ArtifactPaths::in_dir(dir);
    std::fs::write(&paths.model, serde_json::to_vec(model).unwrap()).unwrap();
    std::fs::write(&paths.schema, serde_json::to_vec(&TRAINING_COLUMNS).unwrap()).unwrap();
    paths
}
