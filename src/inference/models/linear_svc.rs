use anyhow::Result;
use candle_core::Tensor;

use crate::inference::classifier::Classifier;
use crate::inference::models::linear::{LinearConfig, LinearParams};

/// Linear support vector classifier. Only exposes a decision function, so it never reports a probability.
pub struct LinearSvc {
    params: LinearParams,
}

impl LinearSvc {
    pub fn new(config: &LinearConfig, n_features: usize) -> Result<Self> {
        Ok(Self {
            params: LinearParams::new(config, n_features)?,
        })
    }
}

impl Classifier for LinearSvc {
    fn kind(&self) -> &'static str {
        "linear_svc"
    }

    fn n_features(&self) -> usize {
        self.params.n_features()
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn predict(&self, features: &Tensor) -> Result<Tensor> {
        let scores = self.params.decision_function(features)?;
        self.params.labels(&scores)
    }
}
