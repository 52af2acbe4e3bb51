use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Published face embedding: exactly [`crate::embedding::EMBEDDING_DIM`]
/// values, produced by unit-normalizing a raw recognizer vector and reducing
/// its dimensionality.
///
/// The values are private so that only the publishing and file-reading paths
/// in [`crate::embedding`] can construct one; an embedding of mismatched
/// dimensionality is rejected before this type ever exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    pub(crate) fn from_validated(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Outcome of comparing two published embeddings.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    /// True when the raw cosine similarity reached the match threshold.
    #[serde(rename = "match")]
    pub matched: bool,
    /// Cosine similarity scaled to 0–100 and rounded to 2 decimal places.
    pub similarity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_serializes_as_plain_array() {
        let e = Embedding::from_validated(vec![0.5, -0.25]);
        assert_eq!(serde_json::to_string(&e).unwrap(), "[0.5,-0.25]");
    }

    #[test]
    fn test_similarity_result_uses_match_key() {
        let r = SimilarityResult { matched: true, similarity: 81.25 };
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"{"match":true,"similarity":81.25}"#
        );
    }
}
