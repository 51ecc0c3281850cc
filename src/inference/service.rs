use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::inference::classifier::LoadedModel;
use crate::inference::models::model::{ModelArtifact, ModelBase};
use crate::inference::preprocess::Preprocessor;
use crate::inference::task::predict::{PredictHandler, PredictionResult};

/// Owns the preprocessor and model for the lifetime of the process.
/// Never mutated after construction, so it is shared between requests behind an `Arc`.
pub struct PredictionService {
    base: ModelBase,
    preprocessor: Box<dyn Preprocessor>,
    model: LoadedModel,
}

impl PredictionService {
    pub fn new(base: ModelBase, preprocessor: impl Preprocessor + 'static, model: LoadedModel) -> Self {
        Self {
            base,
            preprocessor: Box::new(preprocessor),
            model,
        }
    }

    #[tracing::instrument(level = "info")]
    pub fn from_artifact(path: &Path) -> Result<Self> {
        let (base, preprocessor, model) = ModelArtifact::from_file(path)?
            .build()
            .with_context(|| format!("Invalid model artifact {}", path.display()))?;
        info!(
            name = %base.name,
            version = %base.version,
            kind = model.kind(),
            features = model.n_features(),
            probability = model.has_probability(),
            "Model loaded"
        );
        Ok(Self::new(base, preprocessor, model))
    }

    pub fn base(&self) -> &ModelBase {
        &self.base
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }
}

impl PredictHandler for PredictionService {
    #[tracing::instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    fn predict(&self, text: &str) -> Result<PredictionResult> {
        let features = self
            .preprocessor
            .preprocess(text)
            .context("Failed to preprocess text")?;
        let sentiment = self.model.classify(&features)?;

        let probability = match self.model.confidence(&features) {
            None => None,
            Some(Ok(probability)) => Some(probability),
            Some(Err(err)) => {
                warn!(error = %err, "Probability unavailable for this input");
                None
            }
        };

        debug!(%sentiment, ?probability, "Prediction complete");
        Ok(PredictionResult::new(sentiment, probability))
    }
}
