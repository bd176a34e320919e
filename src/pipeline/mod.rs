//! Pipeline stages around the orchestration core.
//!
//! Each submodule implements exactly one transformation step, kept separate
//! so each is independently testable and replaceable:
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ (orchestrator / transcriber) ──▶ postprocess
//! (URL/path) (pdfium)  (base64)                                   (fence strip)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`] — rasterise selected pages to ordered image files; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — page image file → base64 `ImageData` for the multimodal
//!    request body
//! 4. [`postprocess`] — strip the code fences models wrap output in despite
//!    being told not to

pub mod encode;
pub mod input;
pub mod postprocess;
pub mod render;
