//! Error types for the autoscan library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`AutoscanError`] — the fatal, user-visible error surface of a run.
//!   Every variant ends the run; there are no automatic retries anywhere.
//!
//! * [`TranscribeError`] — the cause of a single page's failure at the
//!   transcriber boundary (image encoding, API call, empty response). It is
//!   always wrapped into [`AutoscanError::PageFailed`] before it crosses the
//!   orchestrator boundary, so the surfaced error names the offending page
//!   and image path while the original cause stays attached via `source()`.
//!
//! The one deliberate exception to "any failure is fatal" is the optional
//! polish pass: its failure degrades the run to the unpolished document and
//! is reported only through the observer and a `warn!` log line.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the autoscan library.
#[derive(Debug, Error)]
pub enum AutoscanError {
    // ── Input resolution ──────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but the download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Rendering ─────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The rendering backend failed on a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The renderer produced no page images at all.
    #[error("No page images were rendered from '{path}'")]
    NoPagesRendered { path: PathBuf },

    // ── Configuration ─────────────────────────────────────────────────────
    /// Invalid configuration, rejected before any I/O is performed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured LLM provider could not be initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Page transcription ────────────────────────────────────────────────
    /// A single page's transcription failed. Fatal for the whole run:
    /// skipping a page would desynchronise context chaining and silently
    /// drop content from the assembled document.
    #[error("Transcription failed for page {page} ('{path}')")]
    PageFailed {
        page: usize,
        path: PathBuf,
        #[source]
        source: TranscribeError,
    },

    // ── Output ────────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The cause of a single page's transcription failure.
///
/// Produced at the transcriber boundary and wrapped into
/// [`AutoscanError::PageFailed`] by the orchestrator, which adds the page
/// number and image path.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The page image could not be read or base64-encoded.
    #[error("failed to encode image '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The LLM API call failed.
    #[error("LLM call failed: {message}")]
    Api { message: String },

    /// The model returned an empty transcript for the page.
    #[error("model returned an empty transcript")]
    EmptyTranscript,
}
