//! Text to feature conversion.
//!
//! The preprocessor parameters travel inside the model artifact so that the
//! features produced at serving time line up with the columns the classifier
//! was fitted on.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};

/// Words dropped before vectorizing when the artifact does not list its own.
/// Negations are deliberately absent, they carry most of the sentiment signal.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "being", "between", "both", "but", "by", "can", "could", "did",
    "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i",
    "if", "in", "into", "is", "it", "its", "itself", "me", "more", "most", "my", "myself", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// The feature representation handed to a classifier: a single `(1, n_features)` f32 row.
#[derive(Debug, Clone)]
pub struct FeatureVector(Tensor);

impl FeatureVector {
    pub fn new(tensor: Tensor) -> Self {
        Self(tensor)
    }

    pub fn from_row(values: Vec<f32>) -> Result<Self> {
        let n = values.len();
        Ok(Self(Tensor::from_vec(values, (1, n), &Device::Cpu)?))
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }
}

pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, text: &str) -> Result<FeatureVector>;
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PreprocessorConfig {
    #[serde(default = "enabled")]
    pub lowercase: bool,

    #[serde(default = "enabled")]
    pub strip_html: bool,

    #[serde(default = "enabled")]
    pub strip_urls: bool,

    /// Falls back to [`ENGLISH_STOP_WORDS`] when absent, an empty list disables filtering
    #[serde(default)]
    pub stop_words: Option<Vec<String>>,

    /// Inclusive range of n-gram sizes
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),

    /// Term to feature column
    pub vocabulary: HashMap<String, usize>,

    /// Inverse document frequency per column, raw counts are used when absent
    #[serde(default)]
    pub idf: Option<Vec<f32>>,

    #[serde(default)]
    pub sublinear_tf: bool,

    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
}

fn enabled() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Largest n-gram size an artifact may ask for.
pub const MAX_NGRAM: usize = 10;

/// Bag of n-grams vectorizer with optional tf-idf weighting.
#[derive(Debug, Clone)]
pub struct TextPreprocessor {
    config: PreprocessorConfig,
    stop_words: HashSet<String>,
}

impl TextPreprocessor {
    pub fn new(config: PreprocessorConfig) -> Result<Self> {
        let n_features = config.vocabulary.len();
        if n_features == 0 {
            bail!("Preprocessor vocabulary is empty");
        }

        let mut seen = vec![false; n_features];
        for (term, &index) in &config.vocabulary {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => bail!("Vocabulary index {index} is assigned more than once"),
                None => bail!(
                    "Vocabulary index {index} of term {term:?} is out of range for {n_features} features"
                ),
            }
        }

        if let Some(idf) = &config.idf {
            if idf.len() != n_features {
                bail!(
                    "Preprocessor idf has {} weights, vocabulary has {n_features} terms",
                    idf.len()
                );
            }
        }

        let (min_n, max_n) = config.ngram_range;
        if min_n == 0 || min_n > max_n || max_n > MAX_NGRAM {
            bail!("Invalid ngram range ({min_n}, {max_n}), sizes must lie in 1..={MAX_NGRAM}");
        }

        let stop_words = match &config.stop_words {
            Some(words) => words.iter().map(|w| w.to_lowercase()).collect(),
            None => ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        };

        Ok(Self { config, stop_words })
    }

    pub fn n_features(&self) -> usize {
        self.config.vocabulary.len()
    }

    /// Normalizes raw text into the tokens the vocabulary was built from.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.config.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let text = if self.config.strip_html {
            strip_html_tags(&text)
        } else {
            text
        };

        text.split_whitespace()
            .filter(|word| !(self.config.strip_urls && is_url(word)))
            .flat_map(|word| {
                word.split(|c: char| !c.is_alphanumeric())
                    .filter(|token| token.chars().count() > 1)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|token| !self.stop_words.contains(&token.to_lowercase()))
            .collect()
    }

    fn ngrams(&self, tokens: &[String]) -> Vec<String> {
        let (min_n, max_n) = self.config.ngram_range;
        (min_n..=max_n)
            .flat_map(|n| tokens.windows(n).map(|window| window.join(" ")))
            .collect()
    }

    fn vectorize(&self, terms: &[String]) -> Vec<f32> {
        let mut row = vec![0f32; self.n_features()];
        for term in terms {
            if let Some(&index) = self.config.vocabulary.get(term) {
                row[index] += 1.0;
            }
        }

        if self.config.sublinear_tf {
            for value in row.iter_mut().filter(|v| **v > 0.0) {
                *value = 1.0 + value.ln();
            }
        }

        if let Some(idf) = &self.config.idf {
            for (value, weight) in row.iter_mut().zip(idf) {
                *value *= weight;
            }
        }

        let norm = match self.config.norm {
            Some(Norm::L1) => row.iter().map(|v| v.abs()).sum::<f32>(),
            Some(Norm::L2) => row.iter().map(|v| v * v).sum::<f32>().sqrt(),
            None => 0.0,
        };
        if norm > 0.0 {
            for value in row.iter_mut() {
                *value /= norm;
            }
        }

        row
    }
}

impl Preprocessor for TextPreprocessor {
    #[tracing::instrument(level = "trace", skip_all)]
    fn preprocess(&self, text: &str) -> Result<FeatureVector> {
        let tokens = self.tokenize(text);
        let terms = self.ngrams(&tokens);
        FeatureVector::from_row(self.vectorize(&terms))
    }
}

/// Replaces closed `<tag ...>` spans with a space. A `<` that does not open a tag,
/// or whose `>` never comes, is kept as text.
fn strip_html_tags(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        output.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let opens_tag = candidate[1..]
            .chars()
            .next()
            .is_some_and(|c| c == '/' || c == '!' || c.is_alphabetic());

        match candidate.find('>') {
            Some(end) if opens_tag => {
                output.push(' ');
                rest = &candidate[end + 1..];
            }
            _ => {
                output.push('<');
                rest = &candidate[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn is_url(word: &str) -> bool {
    let lower = word.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(terms: &[&str]) -> PreprocessorConfig {
        PreprocessorConfig {
            lowercase: true,
            strip_html: true,
            strip_urls: true,
            stop_words: None,
            ngram_range: (1, 1),
            vocabulary: terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
            idf: None,
            sublinear_tf: false,
            norm: None,
        }
    }

    fn row(preprocessor: &TextPreprocessor, text: &str) -> Vec<f32> {
        preprocessor
            .preprocess(text)
            .unwrap()
            .tensor()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
    }

    #[test]
    fn tokenize_cleans_markup_urls_and_stop_words() {
        let preprocessor = TextPreprocessor::new(config(&["love"])).unwrap();
        let tokens = preprocessor.tokenize(
            "I <b>LOVED</b> this product!!! See https://example.com/review, it's not bad",
        );
        assert_eq!(tokens, vec!["loved", "product", "see", "not", "bad"]);
    }

    #[test]
    fn less_than_signs_outside_tags_keep_the_text() {
        let mut config = config(&["love", "product"]);
        config.stop_words = Some(vec![]);
        let preprocessor = TextPreprocessor::new(config).unwrap();

        assert_eq!(
            preprocessor.tokenize("I <3 this product, love it"),
            vec!["this", "product", "love", "it"]
        );
        assert_eq!(
            preprocessor.tokenize("price < expected but love the product"),
            vec!["price", "expected", "but", "love", "the", "product"]
        );
        assert_eq!(
            preprocessor.tokenize("love it <span class=\"x\""),
            vec!["love", "it", "span", "class"]
        );
        assert_eq!(row(&preprocessor, "I <3 this product, love it"), vec![1.0, 1.0]);
        assert_eq!(row(&preprocessor, "<p>love</p><br/>product"), vec![1.0, 1.0]);
    }

    #[test]
    fn counts_terms_in_vocabulary_order() {
        let preprocessor = TextPreprocessor::new(config(&["love", "product", "hate"])).unwrap();
        assert_eq!(
            row(&preprocessor, "Love love this product"),
            vec![2.0, 1.0, 0.0]
        );
    }

    #[test]
    fn empty_text_yields_zero_row() {
        let preprocessor = TextPreprocessor::new(config(&["love", "hate"])).unwrap();
        let features = preprocessor.preprocess("").unwrap();
        assert_eq!(features.tensor().dims(), &[1, 2]);
        assert_eq!(row(&preprocessor, ""), vec![0.0, 0.0]);
    }

    #[test]
    fn bigrams_and_tfidf_l2_normalization() {
        let mut config = config(&["not", "not good", "good"]);
        config.stop_words = Some(vec![]);
        config.ngram_range = (1, 2);
        config.idf = Some(vec![1.0, 2.0, 2.0]);
        config.norm = Some(Norm::L2);
        let preprocessor = TextPreprocessor::new(config).unwrap();

        let values = row(&preprocessor, "not good");
        let expected = [1.0f32 / 3.0, 2.0 / 3.0, 2.0 / 3.0];
        for (value, expected) in values.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-6, "{values:?}");
        }
    }

    #[test]
    fn sublinear_tf_and_l1_norm() {
        let mut config = config(&["great", "fine"]);
        config.sublinear_tf = true;
        config.norm = Some(Norm::L1);
        let preprocessor = TextPreprocessor::new(config).unwrap();

        let values = row(&preprocessor, "great great great fine");
        let great = 1.0 + 3f32.ln();
        let total = great + 1.0;
        assert!((values[0] - great / total).abs() < 1e-6);
        assert!((values[1] - 1.0 / total).abs() < 1e-6);
    }

    #[test]
    fn rejects_inconsistent_configurations() {
        let mut sparse = config(&["a"]);
        sparse.vocabulary.insert("b".into(), 5);
        assert!(TextPreprocessor::new(sparse).is_err());

        let mut idf = config(&["good", "bad"]);
        idf.idf = Some(vec![1.0]);
        assert!(TextPreprocessor::new(idf).is_err());

        let mut ngrams = config(&["good"]);
        ngrams.ngram_range = (2, 1);
        assert!(TextPreprocessor::new(ngrams).is_err());

        let mut huge = config(&["good"]);
        huge.ngram_range = (1, 1_000_000_000);
        assert!(TextPreprocessor::new(huge).is_err());

        let mut widest = config(&["good"]);
        widest.ngram_range = (1, MAX_NGRAM);
        assert!(TextPreprocessor::new(widest).is_ok());

        assert!(TextPreprocessor::new(config(&[])).is_err());
    }

    #[test]
    fn artifact_defaults_apply() {
        let config: PreprocessorConfig =
            serde_json::from_str(r#"{ "vocabulary": { "good": 0 } }"#).unwrap();
        assert!(config.lowercase && config.strip_html && config.strip_urls);
        assert_eq!(config.ngram_range, (1, 1));
        assert_eq!(config.norm, Some(Norm::L2));
        assert!(config.stop_words.is_none());
    }
}
