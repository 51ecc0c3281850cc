use anyhow::{bail, Result};
use candle_core::{Device, Tensor};

pub mod linear;
pub mod linear_svc;
pub mod logistic_regression;
pub mod model;
pub mod naive_bayes;

/// Validates the class list of a binary sentiment classifier.
pub(crate) fn binary_classes(classes: &[i64]) -> Result<[i64; 2]> {
    match classes {
        [first, second]
            if first != second && (0..=1).contains(first) && (0..=1).contains(second) =>
        {
            Ok([*first, *second])
        }
        _ => bail!("Expected the binary classes [0, 1], got {classes:?}"),
    }
}

/// Builds a contiguous `(n_features, rows)` tensor from row-major parameters.
pub(crate) fn transposed_matrix(rows: &[Vec<f32>], n_features: usize, name: &str) -> Result<Tensor> {
    if let Some(row) = rows.iter().find(|row| row.len() != n_features) {
        bail!(
            "{name} row has {} columns, the preprocessor produces {n_features} features",
            row.len()
        );
    }
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    let matrix = Tensor::from_vec(data, (rows.len(), n_features), &Device::Cpu)?;
    Ok(matrix.t()?.contiguous()?)
}

/// Picks the class label for one or two decision scores.
pub(crate) fn labels_from_scores(scores: &Tensor, classes: &[i64; 2]) -> Result<Tensor> {
    let values = scores.flatten_all()?.to_vec1::<f32>()?;
    let index = match values.as_slice() {
        [score] => usize::from(*score > 0.0),
        [negative, positive] => usize::from(positive > negative),
        other => bail!("Expected one or two decision scores, got {}", other.len()),
    };
    Ok(Tensor::new(&[classes[index]], scores.device())?)
}
