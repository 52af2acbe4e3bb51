//! OCR engine boundary.
//!
//! Text recognition is an external engine consumed through [`OcrEngine`].
//! The shipped implementation drives the system `tesseract` binary over
//! stdin/stdout with a configuration tuned for a single uniform block of
//! text, which is how identity cards photograph.

use image::{imageops, DynamicImage, GrayImage};
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Upscale factor applied before recognition; small document text reads
/// noticeably better at 2×.
const UPSCALE: u32 = 2;

/// LSTM engine, single uniform block of text.
const TESSERACT_ARGS: [&str; 4] = ["--oem", "3", "--psm", "6"];

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("failed to run {binary}: {reason}")]
    Spawn { binary: String, reason: String },
    #[error("ocr failed: {0}")]
    Failed(String),
    #[error("failed to encode image for ocr: {0}")]
    Encode(String),
}

/// External text-recognition engine.
pub trait OcrEngine {
    /// Recognize all text in a prepared grayscale image.
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Grayscale + upscale preprocessing shared by every engine.
pub fn prepare(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let (w, h) = gray.dimensions();
    imageops::resize(&gray, w * UPSCALE, h * UPSCALE, imageops::FilterType::Triangle)
}

/// Drives the system `tesseract` binary, feeding the image as PNG on stdin
/// and reading recognized text from stdout.
pub struct Tesseract {
    binary: String,
}

impl Tesseract {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl OcrEngine for Tesseract {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let mut png = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| OcrError::Encode(e.to_string()))?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout"])
            .args(TESSERACT_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::Spawn {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;

        // tesseract reads the entire input before emitting output, so write
        // stdin to completion and close it before collecting stdout.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| OcrError::Failed(format!("writing image to engine: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
