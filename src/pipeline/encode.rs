//! Image encoding: rendered page file → base64 `ImageData`.
//!
//! Multimodal APIs accept images as base64 data embedded in the JSON
//! request body. The renderer writes PNGs (lossless — text crispness
//! matters more than size for transcription accuracy), so this stage only
//! reads the bytes back and wraps them. `detail: "high"` asks GPT-4-class
//! models to use the full image tile budget; without it fine print and
//! small tables are lost.
//!
//! Failures here are page-scoped: they surface as [`TranscribeError::Encode`]
//! and are wrapped into the page-transcription failure by the orchestrator.

use crate::error::TranscribeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// Read a rendered page image from disk and base64-encode it for the API.
pub fn encode_image_file(path: &Path) -> Result<ImageData, TranscribeError> {
    let bytes = std::fs::read(path).map_err(|source| TranscribeError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded {} → {} bytes base64", path.display(), b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
