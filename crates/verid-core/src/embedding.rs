//! Embedding post-processing and comparison.
//!
//! The recognizer emits a raw 512-dimensional vector; every downstream
//! consumer fixes the published dimensionality at 128. Publishing normalizes
//! the raw vector to unit L2 norm and then reduces it through a [`Reduce`]
//! policy. The shipped policy is plain truncation: the first 128 components
//! of a unit 512-vector are not themselves a unit vector, so cosine
//! similarity of two published embeddings may not reach 1.0 even for two
//! crops of the same photo. The policy is a trait so a trained projection
//! can replace truncation without touching the rest of the pipeline.

use crate::types::{Embedding, SimilarityResult};
use std::path::Path;
use thiserror::Error;

/// Published embedding dimensionality.
pub const EMBEDDING_DIM: usize = 128;

/// Raw cosine similarity at or above this value counts as the same person.
pub const MATCH_THRESHOLD: f32 = 0.7;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding normalization failed: zero-norm vector")]
    ZeroNorm,
    #[error("invalid embedding shape: expected {expected} values, got {got}")]
    InvalidShape { expected: usize, got: usize },
    #[error("similarity calculation failed (not finite)")]
    NotFinite,
    #[error("error reading {path}: {reason}")]
    Read { path: String, reason: String },
}

/// Dimensionality reduction policy applied to a unit-normalized raw vector.
pub trait Reduce {
    /// Reduce `values` to exactly `target_dim` components.
    fn reduce(&self, values: Vec<f32>, target_dim: usize) -> Vec<f32>;
}

/// Keeps the first `target_dim` components and drops the rest.
///
/// Acknowledged approximation: truncation preserves neither the unit norm
/// nor the cosine geometry that a trained projection would. It is the
/// published behavior; swapping the [`Reduce`] policy is the upgrade path.
pub struct Truncate;

impl Reduce for Truncate {
    fn reduce(&self, mut values: Vec<f32>, target_dim: usize) -> Vec<f32> {
        if values.len() > target_dim {
            values.truncate(target_dim);
        }
        values
    }
}

/// Post-process a raw recognizer vector into a published embedding.
///
/// Normalizes to unit L2 norm (a zero norm is a degenerate embedding and
/// fails), reduces to [`EMBEDDING_DIM`] through `reducer`, and validates the
/// resulting shape before the embedding is allowed to exist.
pub fn publish(raw: &[f32], reducer: &dyn Reduce) -> Result<Embedding, EmbeddingError> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return Err(EmbeddingError::ZeroNorm);
    }

    let unit: Vec<f32> = raw.iter().map(|x| x / norm).collect();
    let reduced = reducer.reduce(unit, EMBEDDING_DIM);
    validate_shape(&reduced)?;

    Ok(Embedding::from_validated(reduced))
}

/// Compare two embedding vectors.
///
/// Shape validation is a hard precondition: both inputs must carry exactly
/// [`EMBEDDING_DIM`] values before any arithmetic runs. A non-finite cosine
/// (zero-magnitude input) is an error, never a sentinel score.
pub fn compare(a: &[f32], b: &[f32]) -> Result<SimilarityResult, EmbeddingError> {
    validate_shape(a)?;
    validate_shape(b)?;

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let raw = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !raw.is_finite() {
        return Err(EmbeddingError::NotFinite);
    }

    Ok(decide(raw))
}

/// Turn a raw cosine similarity into the reported result: threshold at
/// [`MATCH_THRESHOLD`], scale to 0–100, round to 2 decimal places.
fn decide(raw: f32) -> SimilarityResult {
    SimilarityResult {
        matched: raw >= MATCH_THRESHOLD,
        similarity: (f64::from(raw) * 100.0 * 100.0).round() / 100.0,
    }
}

fn validate_shape(values: &[f32]) -> Result<(), EmbeddingError> {
    if values.len() != EMBEDDING_DIM {
        return Err(EmbeddingError::InvalidShape {
            expected: EMBEDDING_DIM,
            got: values.len(),
        });
    }
    Ok(())
}

/// Read a published embedding from a plain-text file: decimal floats
/// separated by any mix of spaces and newlines, exactly [`EMBEDDING_DIM`]
/// of them. Anything else — missing file, malformed token, wrong count —
/// is reported against the offending path.
pub fn read_embedding(path: &Path) -> Result<Embedding, EmbeddingError> {
    let wrap = |reason: String| EmbeddingError::Read {
        path: path.display().to_string(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| wrap(e.to_string()))?;

    let mut values = Vec::with_capacity(EMBEDDING_DIM);
    for token in text.split_whitespace() {
        let value: f32 = token
            .parse()
            .map_err(|_| wrap(format!("malformed value {token:?}")))?;
        values.push(value);
    }

    if let Err(e) = validate_shape(&values) {
        return Err(wrap(e.to_string()));
    }

    Ok(Embedding::from_validated(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_first_axis() -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[0] = 1.0;
        v
    }

    #[test]
    fn test_truncate_keeps_prefix() {
        let values: Vec<f32> = (0..512).map(|i| i as f32).collect();
        let reduced = Truncate.reduce(values, EMBEDDING_DIM);
        assert_eq!(reduced.len(), EMBEDDING_DIM);
        assert_eq!(reduced[0], 0.0);
        assert_eq!(reduced[127], 127.0);
    }

    #[test]
    fn test_truncate_leaves_short_input_alone() {
        let reduced = Truncate.reduce(vec![1.0, 2.0], EMBEDDING_DIM);
        assert_eq!(reduced, vec![1.0, 2.0]);
    }

    #[test]
    fn test_publish_rejects_zero_vector() {
        let raw = vec![0.0f32; 512];
        assert!(matches!(
            publish(&raw, &Truncate),
            Err(EmbeddingError::ZeroNorm)
        ));
    }

    #[test]
    fn test_publish_output_is_exactly_128() {
        let raw = vec![1.0f32; 512];
        let embedding = publish(&raw, &Truncate).unwrap();
        assert_eq!(embedding.values().len(), EMBEDDING_DIM);
    }

    #[test]
    fn test_publish_normalizes_before_reducing() {
        // A single non-zero component normalizes to exactly 1.0 regardless
        // of its original magnitude.
        let mut raw = vec![0.0f32; 512];
        raw[0] = 42.0;
        let embedding = publish(&raw, &Truncate).unwrap();
        assert!((embedding.values()[0] - 1.0).abs() < 1e-6);
        assert!(embedding.values()[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_publish_unit_norm_spread_across_all_components() {
        let raw = vec![1.0f32; 512];
        let embedding = publish(&raw, &Truncate).unwrap();
        let expected = 1.0 / (512.0f32).sqrt();
        assert!(embedding.values().iter().all(|&v| (v - expected).abs() < 1e-6));
    }

    #[test]
    fn test_publish_rejects_underfull_reduction() {
        // A raw vector shorter than the target cannot reach 128 components.
        let raw = vec![1.0f32; 64];
        assert!(matches!(
            publish(&raw, &Truncate),
            Err(EmbeddingError::InvalidShape { expected: EMBEDDING_DIM, got: 64 })
        ));
    }

    #[test]
    fn test_publish_honors_custom_reducer() {
        struct Pad;
        impl Reduce for Pad {
            fn reduce(&self, mut values: Vec<f32>, target_dim: usize) -> Vec<f32> {
                values.resize(target_dim, 0.0);
                values
            }
        }
        let raw = vec![1.0f32; 64];
        let embedding = publish(&raw, &Pad).unwrap();
        assert_eq!(embedding.values().len(), EMBEDDING_DIM);
    }

    #[test]
    fn test_compare_rejects_wrong_length_before_arithmetic() {
        let short = vec![1.0f32; 127];
        let long = vec![1.0f32; 129];
        let ok = unit_first_axis();
        assert!(matches!(
            compare(&short, &ok),
            Err(EmbeddingError::InvalidShape { got: 127, .. })
        ));
        assert!(matches!(
            compare(&ok, &long),
            Err(EmbeddingError::InvalidShape { got: 129, .. })
        ));
    }

    #[test]
    fn test_compare_identical_vector_is_full_match() {
        let v: Vec<f32> = (0..EMBEDDING_DIM).map(|i| (i as f32 * 0.37).sin()).collect();
        let result = compare(&v, &v).unwrap();
        assert!(result.matched);
        assert_eq!(result.similarity, 100.0);
    }

    #[test]
    fn test_compare_orthogonal_vectors_score_zero() {
        let a = unit_first_axis();
        let mut b = vec![0.0f32; EMBEDDING_DIM];
        b[1] = 1.0;
        let result = compare(&a, &b).unwrap();
        assert!(!result.matched);
        assert_eq!(result.similarity, 0.0);
    }

    #[test]
    fn test_compare_is_symmetric() {
        let a: Vec<f32> = (0..EMBEDDING_DIM).map(|i| (i as f32 * 0.11).cos()).collect();
        let b: Vec<f32> = (0..EMBEDDING_DIM).map(|i| (i as f32 * 0.23).sin()).collect();
        let ab = compare(&a, &b).unwrap();
        let ba = compare(&b, &a).unwrap();
        assert_eq!(ab.matched, ba.matched);
        assert_eq!(ab.similarity, ba.similarity);
    }

    #[test]
    fn test_compare_zero_vector_is_degenerate() {
        let zero = vec![0.0f32; EMBEDDING_DIM];
        let unit = unit_first_axis();
        assert!(matches!(
            compare(&zero, &unit),
            Err(EmbeddingError::NotFinite)
        ));
    }

    #[test]
    fn test_decide_threshold_boundary() {
        assert!(decide(0.7).matched);
        assert!(!decide(0.6999).matched);
        assert!(decide(1.0).matched);
        assert!(!decide(-1.0).matched);
    }

    #[test]
    fn test_decide_rounds_to_two_decimals() {
        assert_eq!(decide(0.70711).similarity, 70.71);
        assert_eq!(decide(1.0).similarity, 100.0);
        assert_eq!(decide(0.0).similarity, 0.0);
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("verid-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_embedding_accepts_mixed_whitespace() {
        let mut text = String::new();
        for i in 0..EMBEDDING_DIM {
            text.push_str(&format!("{:.6}", i as f32 / 128.0));
            text.push(if i % 8 == 7 { '\n' } else { ' ' });
        }
        let path = write_temp("ok.txt", &text);
        let embedding = read_embedding(&path).unwrap();
        assert_eq!(embedding.values().len(), EMBEDDING_DIM);
        assert_eq!(embedding.values()[0], 0.0);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_embedding_rejects_wrong_count() {
        let text = vec!["0.5"; 64].join(" ");
        let path = write_temp("short.txt", &text);
        let err = read_embedding(&path).unwrap_err();
        assert!(err.to_string().contains("expected 128"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_embedding_rejects_malformed_token() {
        let mut text = vec!["0.5"; EMBEDDING_DIM - 1].join(" ");
        text.push_str(" not-a-number");
        let path = write_temp("garbled.txt", &text);
        let err = read_embedding(&path).unwrap_err();
        assert!(err.to_string().contains("malformed value"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_embedding_missing_file() {
        let err = read_embedding(Path::new("/nonexistent/embedding.txt")).unwrap_err();
        assert!(matches!(err, EmbeddingError::Read { .. }));
    }
}
