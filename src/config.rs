//! Configuration types for a scan.
//!
//! All behaviour is controlled through [`ScanConfig`], built via its
//! [`ScanConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across tasks and to diff two runs to understand why
//! their outputs differ.

use crate::error::AutoscanError;
use crate::progress::ScanObserver;
use crate::transcriber::{DocumentPolisher, PageTranscriber};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Scheduling policy selector.
///
/// `High` forces strictly sequential transcription with cross-page context
/// chaining; `Low` runs pages concurrently and independently. A `medium`
/// tier existed in earlier revisions of this tool; it is rejected rather
/// than silently treated as either surviving tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    /// Concurrent, independent pages. Fastest; no inter-page context. (default)
    #[default]
    Low,
    /// Sequential with context chaining for stylistic and table continuity.
    High,
}

impl Accuracy {
    /// Rendering DPI for this tier: high accuracy rasterises at 200 DPI so
    /// small fonts and dense tables stay legible to the model, low at 150.
    pub fn dpi(self) -> u32 {
        match self {
            Accuracy::High => 200,
            Accuracy::Low => 150,
        }
    }

    /// Whether this tier schedules pages one at a time with chained context.
    pub fn is_sequential(self) -> bool {
        matches!(self, Accuracy::High)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Accuracy::Low => "low",
            Accuracy::High => "high",
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Accuracy {
    type Err = AutoscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Accuracy::Low),
            "high" => Ok(Accuracy::High),
            other => Err(AutoscanError::InvalidConfig(format!(
                "accuracy must be 'low' or 'high', got '{other}'"
            ))),
        }
    }
}

/// How much of the previous page is handed to the next page's call in
/// sequential mode.
///
/// Source revisions disagreed on full content vs. a bounded tail vs. tail
/// plus the previous image, so the shape is a policy parameter rather than
/// a fixed behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextPolicy {
    /// Pass the previous page's full Markdown.
    Full,
    /// Pass only the trailing `n` characters, bounding prompt growth.
    Tail(usize),
    /// Trailing `n` characters plus the previous page's image.
    TailWithImage(usize),
}

impl Default for ContextPolicy {
    fn default() -> Self {
        ContextPolicy::Tail(4000)
    }
}

impl ContextPolicy {
    /// Character bound on the prior markdown, `None` for the full text.
    pub fn tail_chars(self) -> Option<usize> {
        match self {
            ContextPolicy::Full => None,
            ContextPolicy::Tail(n) | ContextPolicy::TailWithImage(n) => Some(n),
        }
    }

    /// Whether the previous page's image accompanies the text context.
    pub fn includes_image(self) -> bool {
        matches!(self, ContextPolicy::TailWithImage(_))
    }
}

/// Optional first/last page bounds (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageRange {
    pub first: Option<usize>,
    pub last: Option<usize>,
}

impl PageRange {
    /// Expand into 0-indexed page indices for a document of `total` pages.
    pub fn to_indices(&self, total: usize) -> Vec<usize> {
        let first = self.first.unwrap_or(1).max(1);
        let last = self.last.unwrap_or(total).min(total);
        if first > last {
            return Vec::new();
        }
        (first - 1..last).collect()
    }
}

/// Configuration for a PDF-to-Markdown scan.
///
/// Built via [`ScanConfig::builder()`] or [`ScanConfig::default()`].
///
/// # Example
/// ```rust
/// use autoscan::{Accuracy, ScanConfig};
///
/// let config = ScanConfig::builder()
///     .accuracy(Accuracy::High)
///     .concurrency(4)
///     .model("gpt-4o")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// Scheduling mode. Default: [`Accuracy::Low`] (concurrent).
    pub accuracy: Accuracy,

    /// Maximum in-flight transcription calls in concurrent mode.
    /// `None` or `Some(0)` means fully parallel (bound = page count).
    /// Irrelevant in sequential mode, where the context dependency chain
    /// caps effective concurrency at 1.
    pub concurrency: Option<usize>,

    /// Previous-page context shape for sequential mode.
    pub context_policy: ContextPolicy,

    /// Page bounds. Default: the whole document.
    pub pages: PageRange,

    /// Rendering DPI override. When `None` the DPI follows the accuracy
    /// tier ([`Accuracy::dpi`]).
    pub dpi: Option<u32>,

    /// Cap on either rendered image dimension, in pixels. Default: 2000.
    ///
    /// Guards against outsized pages (posters, plans) exhausting memory or
    /// exceeding API upload limits regardless of DPI.
    pub max_rendered_pixels: u32,

    /// LLM model identifier. Default when unset: "gpt-4o".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic"). When unset the
    /// provider is auto-detected from API key environment variables.
    pub provider_name: Option<String>,

    /// Pre-constructed page transcriber. Takes precedence over provider
    /// resolution; the injection point for tests and custom backends.
    pub transcriber: Option<Arc<dyn PageTranscriber>>,

    /// Pre-constructed document polisher, used only when `polish` is set.
    pub polisher: Option<Arc<dyn DocumentPolisher>>,

    /// Run the whole-document polish pass after assembly. Default: false.
    pub polish: bool,

    /// Free-text user instructions forwarded to every LLM call.
    pub instructions: Option<String>,

    /// Custom transcription system prompt. `None` uses the built-in default.
    pub system_prompt: Option<String>,

    /// Sampling temperature. Default: 0.1 — transcription wants the model
    /// faithful to the page, not creative.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Directory for the output Markdown file. `None` writes alongside the
    /// input PDF.
    pub output_dir: Option<PathBuf>,

    /// Directory for rendered page images. When set, the caller owns the
    /// directory and the images are kept after the run; when `None` a
    /// temporary directory is created and deleted when the run completes.
    pub image_dir: Option<PathBuf>,

    /// Observer receiving per-page progress and the run summary.
    pub observer: Option<Arc<dyn ScanObserver>>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::default(),
            concurrency: None,
            context_policy: ContextPolicy::default(),
            pages: PageRange::default(),
            dpi: None,
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            transcriber: None,
            polisher: None,
            polish: false,
            instructions: None,
            system_prompt: None,
            temperature: 0.1,
            max_tokens: 4096,
            output_dir: None,
            image_dir: None,
            observer: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("accuracy", &self.accuracy)
            .field("concurrency", &self.concurrency)
            .field("context_policy", &self.context_policy)
            .field("pages", &self.pages)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field(
                "transcriber",
                &self.transcriber.as_ref().map(|_| "<dyn PageTranscriber>"),
            )
            .field(
                "polisher",
                &self.polisher.as_ref().map(|_| "<dyn DocumentPolisher>"),
            )
            .field("polish", &self.polish)
            .field("instructions", &self.instructions)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("output_dir", &self.output_dir)
            .field("image_dir", &self.image_dir)
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }

    /// DPI after applying the accuracy default.
    pub fn effective_dpi(&self) -> u32 {
        self.dpi.unwrap_or_else(|| self.accuracy.dpi())
    }

    /// Concurrency bound after coercion: `None`/0 becomes the page count
    /// (fully parallel), and the bound is never below 1.
    pub fn effective_concurrency(&self, page_count: usize) -> usize {
        match self.concurrency {
            None | Some(0) => page_count.max(1),
            Some(n) => n,
        }
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn accuracy(mut self, accuracy: Accuracy) -> Self {
        self.config.accuracy = accuracy;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = Some(n);
        self
    }

    pub fn context_policy(mut self, policy: ContextPolicy) -> Self {
        self.config.context_policy = policy;
        self
    }

    pub fn pages(mut self, first: Option<usize>, last: Option<usize>) -> Self {
        self.config.pages = PageRange { first, last };
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = Some(dpi.clamp(72, 400));
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn transcriber(mut self, transcriber: Arc<dyn PageTranscriber>) -> Self {
        self.config.transcriber = Some(transcriber);
        self
    }

    pub fn polisher(mut self, polisher: Arc<dyn DocumentPolisher>) -> Self {
        self.config.polisher = Some(polisher);
        self
    }

    pub fn polish(mut self, v: bool) -> Self {
        self.config.polish = v;
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.config.instructions = Some(text.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = Some(dir.into());
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, AutoscanError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(AutoscanError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let (Some(first), Some(last)) = (c.pages.first, c.pages.last) {
            if first > last {
                return Err(AutoscanError::InvalidConfig(format!(
                    "page range start {first} is after end {last}"
                )));
            }
        }
        if c.pages.first == Some(0) || c.pages.last == Some(0) {
            return Err(AutoscanError::InvalidConfig(
                "pages are 1-indexed, minimum is 1".into(),
            ));
        }
        Ok(self.config)
    }
}
