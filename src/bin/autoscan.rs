//! CLI binary for autoscan.
//!
//! A thin shim over the library crate that maps CLI flags to `ScanConfig`
//! and prints results.

use anyhow::{Context, Result};
use autoscan::{scan, Accuracy, ScanConfig, ScanObserver, UsageTotals};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal progress observer: renders a live progress bar and per-page log
/// lines using [indicatif]. Works correctly when pages complete out of order
/// (concurrent mode).
struct CliObserver {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliObserver {
    /// Create an observer whose progress-bar length is set dynamically by
    /// `on_run_start` (called after rendering, before any LLM call).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        // Spinner only until the page count is known.
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Transcribing");
        self.bar.reset_eta();
    }
}

impl ScanObserver for CliObserver {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Transcribing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page: usize, _total_pages: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page, Instant::now());
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_complete(
        &self,
        page: usize,
        total_pages: usize,
        prompt_tokens: u64,
        completion_tokens: u64,
        cost: f64,
    ) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            page,
            total_pages,
            dim(&format!("{prompt_tokens:>5} in / {completion_tokens:<4} out")),
            dim(&format!("${cost:.4}")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_failed(&self, page: usize, total_pages: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page,
            total_pages,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.finish_and_clear();
    }

    fn on_polish_failed(&self, error: &str) {
        self.bar.println(format!(
            "  {} Polish pass failed ({}); keeping unpolished output",
            yellow("⚠"),
            error
        ));
    }

    fn on_run_complete(&self, total_pages: usize, usage: &UsageTotals, elapsed_secs: f64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages transcribed in {:.1}s",
            green("✔"),
            bold(&total_pages.to_string()),
            elapsed_secs
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}",
            dim(&usage.prompt_tokens.to_string()),
            dim(&usage.completion_tokens.to_string()),
            bold(&format!("${:.4}", usage.cost)),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic scan (writes document.md next to the PDF)
  autoscan document.pdf

  # High accuracy: sequential pages with chained context
  autoscan --accuracy high book.pdf

  # Write output and page images to chosen directories
  autoscan document.pdf -o out/ --image-dir out/pages/

  # Specific pages with a specific model
  autoscan --first-page 3 --last-page 15 --model gpt-4.1 paper.pdf

  # Scan from URL
  autoscan https://arxiv.org/pdf/1706.03762 -o papers/

  # Whole-document polish pass after assembly
  autoscan --polish --instructions "keep footnotes inline" report.pdf

  # JSON result on stdout
  autoscan --json document.pdf > result.json

ACCURACY MODES:
  low   (default)  concurrent page transcription, no cross-page context, 150 DPI
  high             strictly sequential, previous page chained as context, 200 DPI

SUPPORTED PROVIDERS & MODELS:
  Provider     Model                        Input $/1M  Output $/1M
  ─────────    ───────────────────────────  ──────────  ───────────
  openai       gpt-4o (default)             $2.50       $10.00
  openai       gpt-4o-mini                  $0.15       $0.60
  openai       gpt-4.1                      $2.00       $8.00
  openai       gpt-4.1-mini                 $0.40       $1.60
  openai       gpt-4.1-nano                 $0.10       $0.40
  anthropic    claude-sonnet-4-20250514     $3.00       $15.00
  anthropic    claude-haiku-4-20250514      $0.80       $4.00
  gemini       gemini-2.0-flash             $0.10       $0.40

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY       OpenAI API key
  ANTHROPIC_API_KEY    Anthropic API key
  GEMINI_API_KEY       Google Gemini API key
  AUTOSCAN_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  AUTOSCAN_MODEL       Override model ID

SETUP:
  1. Set API key:   export OPENAI_API_KEY=sk-...
  2. Scan:          autoscan document.pdf
"#;

/// Convert PDF files and URLs to Markdown using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "autoscan",
    version,
    about = "Convert PDF files and URLs to Markdown using Vision LLMs",
    long_about = "Convert PDF documents (local files or URLs) to clean, well-structured Markdown \
using Vision Language Models. Supports OpenAI, Anthropic, Google Gemini, and \
any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Directory for the output Markdown file (default: the PDF's directory).
    #[arg(short, long, env = "AUTOSCAN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Keep rendered page images in this directory instead of a temp dir.
    #[arg(long, env = "AUTOSCAN_IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// Accuracy mode: low (concurrent) or high (sequential with context).
    #[arg(long, env = "AUTOSCAN_ACCURACY", default_value = "low")]
    accuracy: String,

    /// LLM model ID (e.g. gpt-4o, gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(
        long,
        env = "AUTOSCAN_MODEL",
        long_help = "Vision LLM model to use. Default: gpt-4o ($2.50/$10 per 1M tokens).\n\
          Cheaper choices: gpt-4o-mini ($0.15/$0.60), gpt-4.1-nano ($0.10/$0.40)."
    )]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "AUTOSCAN_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Rendering DPI override (72–400; default follows the accuracy mode).
    #[arg(long, env = "AUTOSCAN_DPI",
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: Option<u32>,

    /// Max concurrent LLM calls in low-accuracy mode (default: page count).
    #[arg(short, long, env = "AUTOSCAN_CONCURRENCY")]
    concurrency: Option<usize>,

    /// First page to transcribe (1-indexed).
    #[arg(long, env = "AUTOSCAN_FIRST_PAGE")]
    first_page: Option<usize>,

    /// Last page to transcribe (1-indexed, inclusive).
    #[arg(long, env = "AUTOSCAN_LAST_PAGE")]
    last_page: Option<usize>,

    /// Run a whole-document consolidation pass after assembly.
    #[arg(long, env = "AUTOSCAN_POLISH")]
    polish: bool,

    /// Extra instructions forwarded to every LLM call.
    #[arg(long, env = "AUTOSCAN_INSTRUCTIONS")]
    instructions: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "AUTOSCAN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "AUTOSCAN_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "AUTOSCAN_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Output the structured result as JSON on stdout.
    #[arg(long, env = "AUTOSCAN_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "AUTOSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "AUTOSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "AUTOSCAN_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "AUTOSCAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // Accuracy is validated before any rendering or network work.
    let accuracy = Accuracy::from_str(&cli.accuracy)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let config = build_config(&cli, accuracy, show_progress).await?;

    let output = scan(&cli.input, &config).await.context("Scan failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {} pages ({})  →  {}",
            green("✔"),
            output.page_count,
            output.accuracy,
            bold(&output.output_path.display().to_string()),
        );
        if !show_progress {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  ${:.4}  ({:.1}s)",
                dim(&output.prompt_tokens.to_string()),
                dim(&output.completion_tokens.to_string()),
                output.cost,
                output.completion_time,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ScanConfig`.
async fn build_config(cli: &Cli, accuracy: Accuracy, show_progress: bool) -> Result<ScanConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ScanConfig::builder()
        .accuracy(accuracy)
        .pages(cli.first_page, cli.last_page)
        .polish(cli.polish)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout);

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(ref dir) = cli.image_dir {
        builder = builder.image_dir(dir);
    }
    if let Some(ref text) = cli.instructions {
        builder = builder.instructions(text);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if show_progress {
        builder = builder.observer(CliObserver::new_dynamic());
    }

    builder.build().context("Invalid configuration")
}
