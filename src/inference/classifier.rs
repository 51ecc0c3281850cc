use std::fmt::Display;

use anyhow::{bail, Context, Result};
use candle_core::{DType, Tensor};
use serde::Serialize;
use thiserror::Error;

use crate::inference::preprocess::FeatureVector;

/// Tolerance for float noise when validating a probability against `[0, 1]`.
const PROBABILITY_EPSILON: f64 = 1e-6;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Positive,
}

impl Sentiment {
    pub fn label(self) -> u8 {
        match self {
            Sentiment::Negative => 0,
            Sentiment::Positive => 1,
        }
    }
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Positive => write!(f, "positive"),
        }
    }
}

impl TryFrom<i64> for Sentiment {
    type Error = anyhow::Error;

    fn try_from(label: i64) -> Result<Self> {
        match label {
            0 => Ok(Sentiment::Negative),
            1 => Ok(Sentiment::Positive),
            other => bail!("Model returned label {other}, expected 0 or 1"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbabilityError {
    #[error("probability computation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("expected a single row class distribution, got shape {0:?}")]
    Shape(Vec<usize>),

    #[error("probability {0} is not finite")]
    NotFinite(f64),

    #[error("probability {0} is outside [0, 1]")]
    OutOfRange(f64),
}

/// Optional capability of a classifier to report its class distribution.
pub trait ProbabilityEstimator {
    fn predict_proba(&self, features: &Tensor) -> Result<Tensor, ProbabilityError>;
}

pub trait Classifier: Send + Sync {
    fn kind(&self) -> &'static str;

    fn n_features(&self) -> usize;

    /// Predicted class labels for a `(1, n_features)` row.
    /// Any shape holding exactly one integral value is accepted by [`LoadedModel`].
    fn predict(&self, features: &Tensor) -> Result<Tensor>;

    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        None
    }
}

/// A classifier loaded for the lifetime of the process.
pub struct LoadedModel {
    classifier: Box<dyn Classifier>,
}

impl LoadedModel {
    pub fn new(classifier: impl Classifier + 'static) -> Self {
        Self {
            classifier: Box::new(classifier),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    pub fn has_probability(&self) -> bool {
        self.classifier.probability_estimator().is_some()
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Sentiment> {
        let output = self
            .classifier
            .predict(features.tensor())
            .context("Failed to classify text")?;
        normalize_label(&output)
    }

    /// `None` when the classifier has no probability capability.
    pub fn confidence(&self, features: &FeatureVector) -> Option<Result<f64, ProbabilityError>> {
        let estimator = self.classifier.probability_estimator()?;
        Some(
            estimator
                .predict_proba(features.tensor())
                .and_then(|distribution| max_probability(&distribution)),
        )
    }
}

fn normalize_label(output: &Tensor) -> Result<Sentiment> {
    let values = output
        .flatten_all()?
        .to_dtype(DType::F64)?
        .to_vec1::<f64>()?;
    let [value] = values.as_slice() else {
        bail!(
            "Expected a single label from the model, got {} values",
            values.len()
        )
    };
    if !value.is_finite() || value.fract() != 0.0 {
        bail!("Model returned non-integral label {value}");
    }
    Sentiment::try_from(*value as i64)
}

fn max_probability(distribution: &Tensor) -> Result<f64, ProbabilityError> {
    match distribution.dims() {
        [1, k] | [k] if *k > 0 => {}
        dims => return Err(ProbabilityError::Shape(dims.to_vec())),
    }

    let probability = distribution
        .flatten_all()?
        .to_dtype(DType::F64)?
        .max(0)?
        .to_scalar::<f64>()?;

    if !probability.is_finite() {
        return Err(ProbabilityError::NotFinite(probability));
    }
    if !(-PROBABILITY_EPSILON..=1.0 + PROBABILITY_EPSILON).contains(&probability) {
        return Err(ProbabilityError::OutOfRange(probability));
    }
    Ok(probability.clamp(0.0, 1.0))
}
