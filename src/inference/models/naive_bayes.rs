use anyhow::{bail, Result};
use candle_core::{Device, Tensor, D};
use candle_nn::ops::softmax;
use serde::{Deserialize, Serialize};

use crate::inference::classifier::{Classifier, ProbabilityError, ProbabilityEstimator};
use crate::inference::models::linear::default_classes;
use crate::inference::models::{binary_classes, labels_from_scores, transposed_matrix};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NaiveBayesConfig {
    pub class_log_prior: Vec<f32>,
    pub feature_log_prob: Vec<Vec<f32>>,
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,
}

/// Multinomial naive Bayes over term weights.
pub struct MultinomialNb {
    feature_log_prob: Tensor,
    class_log_prior: Tensor,
    classes: [i64; 2],
    n_features: usize,
}

impl MultinomialNb {
    pub fn new(config: &NaiveBayesConfig, n_features: usize) -> Result<Self> {
        if config.class_log_prior.len() != 2 || config.feature_log_prob.len() != 2 {
            bail!(
                "Expected two class priors and two feature log probability rows, got {} and {}",
                config.class_log_prior.len(),
                config.feature_log_prob.len()
            );
        }

        Ok(Self {
            feature_log_prob: transposed_matrix(
                &config.feature_log_prob,
                n_features,
                "feature_log_prob",
            )?,
            class_log_prior: Tensor::new(config.class_log_prior.as_slice(), &Device::Cpu)?,
            classes: binary_classes(&config.classes)?,
            n_features,
        })
    }

    fn joint_log_likelihood(&self, features: &Tensor) -> candle_core::Result<Tensor> {
        features
            .matmul(&self.feature_log_prob)?
            .broadcast_add(&self.class_log_prior)
    }
}

impl Classifier for MultinomialNb {
    fn kind(&self) -> &'static str {
        "multinomial_nb"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn predict(&self, features: &Tensor) -> Result<Tensor> {
        let jll = self.joint_log_likelihood(features)?;
        labels_from_scores(&jll, &self.classes)
    }

    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        Some(self)
    }
}

impl ProbabilityEstimator for MultinomialNb {
    fn predict_proba(&self, features: &Tensor) -> Result<Tensor, ProbabilityError> {
        Ok(softmax(&self.joint_log_likelihood(features)?, D::Minus1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> MultinomialNb {
        let config = NaiveBayesConfig {
            class_log_prior: vec![0.5f32.ln(), 0.5f32.ln()],
            feature_log_prob: vec![
                vec![0.8f32.ln(), 0.2f32.ln()],
                vec![0.2f32.ln(), 0.8f32.ln()],
            ],
            classes: vec![0, 1],
        };
        MultinomialNb::new(&config, 2).unwrap()
    }

    #[test]
    fn picks_class_with_highest_likelihood() {
        let nb = model();
        let positive = Tensor::new(&[[0f32, 2.0]], &Device::Cpu).unwrap();
        let negative = Tensor::new(&[[1f32, 0.0]], &Device::Cpu).unwrap();
        assert_eq!(nb.predict(&positive).unwrap().to_vec1::<i64>().unwrap(), vec![1]);
        assert_eq!(nb.predict(&negative).unwrap().to_vec1::<i64>().unwrap(), vec![0]);
    }

    #[test]
    fn probabilities_follow_bayes_rule() {
        let nb = model();
        let features = Tensor::new(&[[0f32, 1.0]], &Device::Cpu).unwrap();
        let p = nb
            .predict_proba(&features)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert!((p[1] - 0.8).abs() < 1e-5, "{p:?}");
        assert!((p[0] - 0.2).abs() < 1e-5, "{p:?}");
    }

    #[test]
    fn requires_two_classes() {
        let config = NaiveBayesConfig {
            class_log_prior: vec![0.0],
            feature_log_prob: vec![vec![0.0, 0.0]],
            classes: vec![0, 1],
        };
        assert!(MultinomialNb::new(&config, 2).is_err());
    }
}
