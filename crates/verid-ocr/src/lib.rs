//! verid-ocr — structured identity-field extraction from document photos.
//!
//! Decodes a document image, enhances it for recognition (grayscale plus 2×
//! upscale), runs the external OCR engine, and applies independent per-field
//! pattern rules over the recovered text. A field whose pattern does not
//! match is omitted from the result; a decode or OCR failure aborts the
//! whole call.

pub mod engine;
pub mod fields;

pub use engine::{OcrEngine, OcrError, Tesseract};
pub use fields::DocumentFields;

use chrono::Local;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("invalid image path or unreadable image: {0}")]
    ImageLoad(String),
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

/// Extract identity fields from the document image at `path`.
///
/// Field-level misses degrade the result (omitted keys); only decode and
/// OCR failures abort the call.
pub fn extract(path: &Path, engine: &dyn OcrEngine) -> Result<DocumentFields, DocumentError> {
    let decoded = image::open(path).map_err(|e| DocumentError::ImageLoad(e.to_string()))?;
    let prepared = engine::prepare(&decoded);
    let text = engine.recognize(&prepared)?;
    tracing::debug!(chars = text.len(), "document text recovered");
    Ok(fields::parse(&text, Local::now().date_naive()))
}
