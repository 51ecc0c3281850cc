use anyhow::Error;
use serde::{Deserialize, Serialize};

use crate::inference::classifier::Sentiment;

#[derive(Deserialize, Serialize, Debug)]
pub struct PredictionRequest {
    pub text: String,
}

/// Built only from a [`Sentiment`], so `label` and `prediction` always agree.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PredictionResult {
    label: u8,
    prediction: Sentiment,
    probability: Option<f64>,
}

impl PredictionResult {
    pub fn new(sentiment: Sentiment, probability: Option<f64>) -> Self {
        Self {
            label: sentiment.label(),
            prediction: sentiment,
            probability: probability.map(round_probability),
        }
    }

    pub fn label(&self) -> u8 {
        self.label
    }

    pub fn sentiment(&self) -> Sentiment {
        self.prediction
    }

    pub fn probability(&self) -> Option<f64> {
        self.probability
    }
}

/// Rounds to 4 decimal places.
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}

pub trait PredictHandler {
    fn predict(&self, text: &str) -> Result<PredictionResult, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_label_and_prediction_in_sync() {
        let positive = PredictionResult::new(Sentiment::Positive, Some(0.920_000_016_7));
        assert_eq!(
            serde_json::to_value(&positive).unwrap(),
            serde_json::json!({ "label": 1, "prediction": "positive", "probability": 0.92 })
        );

        let negative = PredictionResult::new(Sentiment::Negative, None);
        assert_eq!(
            serde_json::to_value(&negative).unwrap(),
            serde_json::json!({ "label": 0, "prediction": "negative", "probability": null })
        );
    }

    #[test]
    fn rounds_to_four_decimals() {
        assert_eq!(round_probability(0.123_456), 0.1235);
        assert_eq!(round_probability(0.999_96), 1.0);
        assert_eq!(round_probability(0.5), 0.5);
    }

    #[test]
    fn request_requires_text() {
        assert!(serde_json::from_str::<PredictionRequest>(r#"{ "txt": "hi" }"#).is_err());
        let request: PredictionRequest = serde_json::from_str(r#"{ "text": "" }"#).unwrap();
        assert_eq!(request.text, "");
    }
}
