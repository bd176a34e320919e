//! # autoscan
//!
//! Convert PDF documents to Markdown using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Traditional PDF-to-text tools (pdftotext, pdf-extract) fail on complex
//! layouts — multi-column text, mathematical symbols, figures, and tables come
//! out garbled or out of reading order. Instead this crate rasterises each page
//! into a PNG and lets a VLM read it as a human would, producing semantically
//! correct Markdown that preserves structure, tables, and formulae.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input        resolve local file or download from URL
//!  ├─ 2. Render       rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Transcribe   VLM calls — concurrent (low) or sequential with
//!  │                  chained context (high)
//!  ├─ 4. Assemble     join pages, table-aware separators
//!  ├─ 5. Polish       optional whole-document consolidation pass
//!  └─ 6. Write        <stem>.md alongside the PDF (or in --output-dir)
//! ```
//!
//! ## Accuracy Modes
//!
//! | Mode   | Scheduling | Context | DPI | Best for |
//! |--------|-----------|---------|-----|----------|
//! | `low`  | concurrent, bounded | none | 150 | speed, independent pages |
//! | `high` | strictly sequential | previous page chained | 200 | tables and lists spanning pages |
//!
//! Any page failure aborts the run: a document with silently missing pages
//! is worse than no document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autoscan::{scan, Accuracy, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ScanConfig::builder().accuracy(Accuracy::High).build()?;
//!     let output = scan("document.pdf", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("tokens: {} in / {} out  (${:.4})",
//!         output.prompt_tokens, output.completion_tokens, output.cost);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `autoscan` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! autoscan = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assembler;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod scan;
pub mod transcriber;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assembler::join_pages;
pub use config::{Accuracy, ContextPolicy, PageRange, ScanConfig, ScanConfigBuilder};
pub use error::{AutoscanError, TranscribeError};
pub use orchestrator::{transcribe_pages, Transcript};
pub use output::{ScanOutput, TranscriptionResult, UsageTotals};
pub use pipeline::render::PageImage;
pub use progress::{NoopObserver, Observer, ScanObserver};
pub use scan::scan;
pub use transcriber::{
    DocumentPolisher, PageContext, PageTranscriber, VisionPolisher, VisionTranscriber,
};
