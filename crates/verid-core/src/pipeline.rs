//! End-to-end embedding extraction: decode → detect → align → embed → publish.
//!
//! Model handles are loaded once per process and never mutated afterwards;
//! one invocation processes exactly one image.

use crate::alignment;
use crate::detector::{DetectorError, FaceDetector};
use crate::embedding::{self, EmbeddingError, Reduce, Truncate};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Embedding;
use image::RgbImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read image {path}: {reason}")]
    ImageLoad { path: String, reason: String },
    /// Valid image, nobody there. Callers special-case this: it is not a
    /// failure of the pipeline.
    #[error("No face detected")]
    NoFaceDetected,
    #[error("detector returned a face without landmarks")]
    MissingLandmarks,
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Recognizer(#[from] RecognizerError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("cannot write face crop {path}: {reason}")]
    CropWrite { path: String, reason: String },
}

/// Successful extraction: the published 128-d embedding plus the basename of
/// the persisted face crop.
#[derive(Debug, Serialize)]
pub struct Extraction {
    pub embedding: Embedding,
    pub cropped_face: String,
}

/// Face verification engine holding the one-time-loaded model handles.
pub struct FaceVerifier {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    reducer: Box<dyn Reduce>,
}

impl FaceVerifier {
    /// Load both models. Call once at process start; the handles are
    /// read-only for the rest of the process lifetime.
    pub fn load(detector_model: &str, recognizer_model: &str) -> Result<Self, PipelineError> {
        Ok(Self {
            detector: FaceDetector::load(detector_model)?,
            recognizer: FaceRecognizer::load(recognizer_model)?,
            reducer: Box::new(Truncate),
        })
    }

    /// Extract a published embedding from the image at `path`.
    ///
    /// Side effect: persists the aligned face crop next to the source image
    /// as `<basename>_face.jpg`. A crop that cannot be written fails the
    /// whole call.
    pub fn extract(&mut self, path: &Path) -> Result<Extraction, PipelineError> {
        let image = load_rgb(path)?;

        let faces = self.detector.detect(&image)?;
        // Single-face contract: the most confident detection wins.
        let face = faces
            .into_iter()
            .next()
            .ok_or(PipelineError::NoFaceDetected)?;
        let landmarks = face.landmarks.ok_or(PipelineError::MissingLandmarks)?;
        tracing::debug!(confidence = face.confidence, "face located");

        let crop = alignment::align_face(&image, &landmarks);
        let raw = self.recognizer.extract(&crop)?;
        let embedding = embedding::publish(&raw, self.reducer.as_ref())?;

        let crop_path = cropped_face_path(path);
        crop.save(&crop_path).map_err(|e| PipelineError::CropWrite {
            path: crop_path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(crop = %crop_path.display(), "persisted face crop");

        let cropped_face = crop_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Extraction { embedding, cropped_face })
    }
}

fn load_rgb(path: &Path) -> Result<RgbImage, PipelineError> {
    let decoded = image::open(path).map_err(|e| PipelineError::ImageLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(decoded.to_rgb8())
}

/// Path for the persisted face crop: `_face` inserted before the extension,
/// which is normalized to `.jpg` regardless of the source format.
pub fn cropped_face_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "face".to_string());
    source.with_file_name(format!("{stem}_face.jpg"))
}
