//! The run controller: one scan from input string to written Markdown.
//!
//! [`scan`] wires the stages together in fixed order: resolve input, render
//! pages, transcribe, assemble, optionally polish, write output. Every stage
//! failure is fatal except the polish pass, which degrades to the unpolished
//! document.

use crate::assembler::join_pages;
use crate::config::ScanConfig;
use crate::error::AutoscanError;
use crate::orchestrator::transcribe_pages;
use crate::output::{ScanOutput, UsageTotals};
use crate::pipeline::input::resolve_input;
use crate::pipeline::render::render_pages;
use crate::progress::{NoopObserver, ScanObserver};
use crate::transcriber::{
    resolve_provider, DocumentPolisher, PageTranscriber, VisionPolisher, VisionTranscriber,
    DEFAULT_MODEL,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{info, warn};

/// Convert a PDF (local path or `http(s)` URL) to a Markdown file.
///
/// The assembled document is written to `<output_dir>/<stem>.md`, where
/// `output_dir` defaults to the PDF's own directory. Returns the written
/// path, the document, and the run's token/cost totals.
///
/// # Example
/// ```rust,no_run
/// use autoscan::{scan, Accuracy, ScanConfig};
///
/// # async fn run() -> Result<(), autoscan::AutoscanError> {
/// let config = ScanConfig::builder()
///     .accuracy(Accuracy::High)
///     .build()?;
/// let output = scan("report.pdf", &config).await?;
/// println!("{} pages → {}", output.page_count, output.output_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn scan(input: impl AsRef<str>, config: &ScanConfig) -> Result<ScanOutput, AutoscanError> {
    let start = Instant::now();
    let input = input.as_ref();

    let observer: Arc<dyn ScanObserver> = config
        .observer
        .clone()
        .unwrap_or_else(|| Arc::new(NoopObserver));

    let resolved = resolve_input(input, config.download_timeout_secs).await?;
    let pdf_path = resolved.path();

    let output_dir = resolve_output_dir(pdf_path, config)?;
    let image_dir = resolve_image_dir(config)?;

    let pages = render_pages(pdf_path, image_dir.path(), config).await?;
    observer.on_run_start(pages.len());

    let transcriber: Arc<dyn PageTranscriber> = match config.transcriber.clone() {
        Some(t) => t,
        None => {
            let provider = resolve_provider(config)?;
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            Arc::new(VisionTranscriber::new(provider, model, config))
        }
    };

    let transcript = transcribe_pages(transcriber, &pages, config, &observer).await?;
    let page_count = transcript.pages.len();
    let mut usage = transcript.usage;
    let mut document = join_pages(&transcript.pages);

    if config.polish && !document.is_empty() {
        let polisher: Arc<dyn DocumentPolisher> = match config.polisher.clone() {
            Some(p) => p,
            None => {
                let provider = resolve_provider(config)?;
                let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
                Arc::new(VisionPolisher::new(provider, model, config))
            }
        };
        document = apply_polish(polisher, document, &mut usage, &observer).await;
    }

    let output_path = output_dir.join(markdown_filename(pdf_path));
    write_markdown(&output_path, &document)?;
    info!("Wrote {} ({} bytes)", output_path.display(), document.len());

    let completion_time = start.elapsed().as_secs_f64();
    observer.on_run_complete(page_count, &usage, completion_time);

    Ok(ScanOutput {
        completion_time,
        output_path,
        markdown: document,
        page_count,
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        cost: usage.cost,
        accuracy: config.accuracy,
    })
}

/// Run the polish pass, keeping the unpolished document on any failure.
///
/// An error or an empty response from the polisher is reported through the
/// observer and a log line but never fails the run; the page transcriptions
/// are already paid for and correct.
async fn apply_polish(
    polisher: Arc<dyn DocumentPolisher>,
    document: String,
    usage: &mut UsageTotals,
    observer: &Arc<dyn ScanObserver>,
) -> String {
    match polisher.polish(&document).await {
        Ok(result) if !result.content.trim().is_empty() => {
            usage.record(&result);
            info!("Polish pass applied ({} chars)", result.content.len());
            result.content
        }
        Ok(_) => {
            warn!("Polish pass returned an empty document; keeping unpolished output");
            observer.on_polish_failed("polish returned an empty document");
            document
        }
        Err(e) => {
            warn!("Polish pass failed: {e}; keeping unpolished output");
            observer.on_polish_failed(&e.to_string());
            document
        }
    }
}

/// Directory for rendered page images, either caller-owned or temporary.
enum ImageDir {
    Owned(PathBuf),
    Temp(TempDir),
}

impl ImageDir {
    fn path(&self) -> &Path {
        match self {
            ImageDir::Owned(p) => p,
            ImageDir::Temp(t) => t.path(),
        }
    }
}

/// The caller's image directory is created and kept; without one a temp
/// directory is used and deleted when the scan returns.
fn resolve_image_dir(config: &ScanConfig) -> Result<ImageDir, AutoscanError> {
    match &config.image_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                AutoscanError::Internal(format!(
                    "failed to create image directory '{}': {e}",
                    dir.display()
                ))
            })?;
            Ok(ImageDir::Owned(dir.clone()))
        }
        None => TempDir::new()
            .map(ImageDir::Temp)
            .map_err(|e| AutoscanError::Internal(format!("failed to create temp dir: {e}"))),
    }
}

/// Output directory: the configured one (created if missing), else the
/// PDF's own directory.
fn resolve_output_dir(pdf_path: &Path, config: &ScanConfig) -> Result<PathBuf, AutoscanError> {
    match &config.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| AutoscanError::OutputWriteFailed {
                path: dir.clone(),
                source,
            })?;
            Ok(dir.clone())
        }
        None => {
            let parent = pdf_path.parent().unwrap_or_else(|| Path::new("."));
            if parent.as_os_str().is_empty() {
                Ok(PathBuf::from("."))
            } else {
                Ok(parent.to_path_buf())
            }
        }
    }
}

/// `<stem>.md` for the input PDF's file name.
fn markdown_filename(pdf_path: &Path) -> String {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("{stem}.md")
}

/// Write the document via a temp file and rename, so a crash mid-write
/// never leaves a truncated `.md` behind.
fn write_markdown(path: &Path, document: &str) -> Result<(), AutoscanError> {
    let tmp = path.with_extension("md.tmp");

    std::fs::write(&tmp, document).map_err(|source| AutoscanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        AutoscanError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })
}
