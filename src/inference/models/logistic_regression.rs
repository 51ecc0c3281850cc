use anyhow::Result;
use candle_core::{Tensor, D};
use candle_nn::ops::softmax;

use crate::inference::classifier::{Classifier, ProbabilityError, ProbabilityEstimator};
use crate::inference::models::linear::{LinearConfig, LinearParams};

pub struct LogisticRegression {
    params: LinearParams,
}

impl LogisticRegression {
    pub fn new(config: &LinearConfig, n_features: usize) -> Result<Self> {
        Ok(Self {
            params: LinearParams::new(config, n_features)?,
        })
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> usize {
        self.params.n_features()
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn predict(&self, features: &Tensor) -> Result<Tensor> {
        let scores = self.params.decision_function(features)?;
        self.params.labels(&scores)
    }

    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        Some(self)
    }
}

impl ProbabilityEstimator for LogisticRegression {
    fn predict_proba(&self, features: &Tensor) -> Result<Tensor, ProbabilityError> {
        let scores = self.params.decision_function(features)?;
        if self.params.rows() == 1 {
            // sigmoid of the single score gives the second class
            let second = scores.neg()?.exp()?.affine(1.0, 1.0)?.recip()?;
            let first = second.affine(-1.0, 1.0)?;
            Ok(Tensor::cat(&[&first, &second], 1)?)
        } else {
            Ok(softmax(&scores, D::Minus1)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    fn probabilities(model: &LogisticRegression, row: &[f32]) -> Vec<f32> {
        let features = Tensor::new(row, &Device::Cpu).unwrap().unsqueeze(0).unwrap();
        model
            .predict_proba(&features)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
    }

    #[test]
    fn single_row_uses_sigmoid() {
        let config = LinearConfig {
            coef: vec![vec![11.5f32.ln(), -1.0]],
            intercept: vec![0.0],
            classes: vec![0, 1],
        };
        let model = LogisticRegression::new(&config, 2).unwrap();

        let p = probabilities(&model, &[1.0, 0.0]);
        assert!((p[1] - 0.92).abs() < 1e-5, "{p:?}");
        assert!((p[0] + p[1] - 1.0).abs() < 1e-6);

        let features = Tensor::new(&[[1f32, 0.0]], &Device::Cpu).unwrap();
        assert_eq!(
            model.predict(&features).unwrap().to_vec1::<i64>().unwrap(),
            vec![1]
        );
    }

    #[test]
    fn two_rows_use_softmax() {
        let config = LinearConfig {
            coef: vec![vec![0.0, 2.0], vec![1.0, 0.0]],
            intercept: vec![0.0, 0.0],
            classes: vec![0, 1],
        };
        let model = LogisticRegression::new(&config, 2).unwrap();

        let p = probabilities(&model, &[0.0, 1.0]);
        let expected = 1.0 / (1.0 + (-2f32).exp());
        assert!((p[0] - expected).abs() < 1e-5, "{p:?}");
        assert!(model.probability_estimator().is_some());
    }

    #[test]
    fn rejects_mismatched_parameters() {
        let missing_intercept = LinearConfig {
            coef: vec![vec![1.0]],
            intercept: vec![],
            classes: vec![0, 1],
        };
        let three_rows = LinearConfig {
            coef: vec![vec![1.0], vec![1.0], vec![1.0]],
            intercept: vec![0.0, 0.0, 0.0],
            classes: vec![0, 1],
        };
        assert!(LogisticRegression::new(&missing_intercept, 1).is_err());
        assert!(LogisticRegression::new(&three_rows, 1).is_err());
    }
}
