use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::inference::classifier::LoadedModel;
use crate::inference::models::linear::LinearConfig;
use crate::inference::models::linear_svc::LinearSvc;
use crate::inference::models::logistic_regression::LogisticRegression;
use crate::inference::models::naive_bayes::{MultinomialNb, NaiveBayesConfig};
use crate::inference::preprocess::{PreprocessorConfig, TextPreprocessor};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelBase {
    /// The name of the model
    pub name: String,

    /// The version of the model, informational only
    #[serde(default)]
    pub version: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierConfig {
    LogisticRegression(LinearConfig),
    LinearSvc(LinearConfig),
    MultinomialNb(NaiveBayesConfig),
}

impl ClassifierConfig {
    pub fn build(&self, n_features: usize) -> Result<LoadedModel> {
        let model = match self {
            ClassifierConfig::LogisticRegression(config) => {
                LoadedModel::new(LogisticRegression::new(config, n_features)?)
            }
            ClassifierConfig::LinearSvc(config) => {
                LoadedModel::new(LinearSvc::new(config, n_features)?)
            }
            ClassifierConfig::MultinomialNb(config) => {
                LoadedModel::new(MultinomialNb::new(config, n_features)?)
            }
        };
        Ok(model)
    }
}

/// The serialized model: preprocessing parameters plus a fitted binary classifier.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelArtifact {
    #[serde(flatten)]
    pub base: ModelBase,
    pub preprocessor: PreprocessorConfig,
    pub classifier: ClassifierConfig,
}

impl ModelArtifact {
    pub fn from_file(path: &Path) -> Result<Self> {
        let str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        Self::from_json(&str)
            .with_context(|| format!("Failed to load model artifact {}", path.display()))
    }

    pub fn from_json(str: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(str)?;
        if artifact.base.name.trim().is_empty() {
            bail!("Model artifact has no name");
        }
        Ok(artifact)
    }

    /// Validates the parameters and builds the runtime components.
    pub fn build(self) -> Result<(ModelBase, TextPreprocessor, LoadedModel)> {
        let preprocessor =
            TextPreprocessor::new(self.preprocessor).context("Invalid preprocessor")?;
        let model = self
            .classifier
            .build(preprocessor.n_features())
            .context("Invalid classifier")?;
        Ok((self.base, preprocessor, model))
    }
}
