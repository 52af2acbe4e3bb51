//! verid-core — face embedding extraction and comparison engine.
//!
//! Uses SCRFD for face detection and ArcFace for embedding extraction, both
//! running via ONNX Runtime for CPU inference. The published embedding is the
//! unit-normalized ArcFace vector reduced to 128 dimensions; comparison is
//! cosine similarity against a fixed 0.7 match threshold.

pub mod alignment;
pub mod detector;
pub mod embedding;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use embedding::{compare, publish, read_embedding, EmbeddingError, EMBEDDING_DIM};
pub use pipeline::{Extraction, FaceVerifier, PipelineError};
pub use types::{BoundingBox, Embedding, SimilarityResult};
