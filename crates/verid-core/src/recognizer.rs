//! ArcFace embedding generator via ONNX Runtime.
//!
//! External model boundary: maps an aligned 160×160 face crop to the raw
//! 512-dimensional embedding. Normalization and dimensionality reduction are
//! deliberately NOT done here — they belong to the post-processor in
//! [`crate::embedding`].

use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_INPUT_SIZE: u32 = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // NOT 128.0 — ArcFace uses symmetric normalization
const RAW_EMBEDDING_DIM: usize = 512;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("face recognition model not found: {0} — download from insightface and place in the model directory")]
    ModelNotFound(String),
    #[error("embedding extraction failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based embedding generator.
pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, RecognizerError> {
        if !Path::new(model_path).exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face recognition model"
        );

        Ok(Self { session })
    }

    /// Extract the raw embedding from an aligned face crop.
    ///
    /// The crop is resized to the 112×112 model input; the returned vector
    /// has exactly [`RAW_EMBEDDING_DIM`] components and is unnormalized.
    pub fn extract(&mut self, crop: &RgbImage) -> Result<Vec<f32>, RecognizerError> {
        let input = Self::preprocess(crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(e.to_string()))?;

        let raw: Vec<f32> = raw_data.to_vec();
        if raw.len() != RAW_EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {RAW_EMBEDDING_DIM}-dim raw embedding, got {}",
                raw.len()
            )));
        }

        Ok(raw)
    }

    /// Resize the aligned crop to the model input size and lay it out as a
    /// normalized NCHW float tensor.
    fn preprocess(crop: &RgbImage) -> Array4<f32> {
        let resized = if crop.dimensions() == (ARCFACE_INPUT_SIZE, ARCFACE_INPUT_SIZE) {
            crop.clone()
        } else {
            image::imageops::resize(
                crop,
                ARCFACE_INPUT_SIZE,
                ARCFACE_INPUT_SIZE,
                image::imageops::FilterType::Triangle,
            )
        };

        let size = ARCFACE_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel.0[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
            }
        }
        tensor
    }
}
