use anyhow::{bail, Result};
use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};

use crate::inference::models::{binary_classes, labels_from_scores, transposed_matrix};

/// Parameters shared by linear decision functions.
/// `coef` holds one row for a single decision score or two rows, one per class.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LinearConfig {
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,
}

pub(crate) fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

pub(crate) struct LinearParams {
    weights: Tensor,
    intercept: Tensor,
    classes: [i64; 2],
    rows: usize,
    n_features: usize,
}

impl LinearParams {
    pub fn new(config: &LinearConfig, n_features: usize) -> Result<Self> {
        let rows = config.coef.len();
        if !(1..=2).contains(&rows) {
            bail!("Expected one or two coefficient rows, got {rows}");
        }
        if config.intercept.len() != rows {
            bail!(
                "Expected {rows} intercepts, got {}",
                config.intercept.len()
            );
        }

        Ok(Self {
            weights: transposed_matrix(&config.coef, n_features, "coef")?,
            intercept: Tensor::new(config.intercept.as_slice(), &Device::Cpu)?,
            classes: binary_classes(&config.classes)?,
            rows,
            n_features,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// `(1, rows)` scores for a `(1, n_features)` row.
    pub fn decision_function(&self, features: &Tensor) -> candle_core::Result<Tensor> {
        features.matmul(&self.weights)?.broadcast_add(&self.intercept)
    }

    pub fn labels(&self, scores: &Tensor) -> Result<Tensor> {
        labels_from_scores(scores, &self.classes)
    }
}
