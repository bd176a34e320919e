//! Result and aggregation types shared between the orchestrator and the
//! run controller.

use crate::config::Accuracy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The structured result of one LLM call (page transcription or polish).
///
/// Immutable once produced. The orchestrator folds token counts and cost
/// into the running [`UsageTotals`] and keeps only the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Markdown produced by the call, code fences already stripped.
    pub content: String,
    /// Tokens consumed by the prompt (image + context + instructions).
    pub prompt_tokens: u64,
    /// Tokens generated by the model.
    pub completion_tokens: u64,
    /// Cost of the call in USD, from the per-model pricing table.
    pub cost: f64,
}

/// Running token/cost totals for a scan.
///
/// Written exactly once per completed call; the totals are plain sums and
/// therefore independent of completion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: f64,
}

impl UsageTotals {
    /// Fold one call's usage into the totals.
    pub fn record(&mut self, result: &TranscriptionResult) {
        self.prompt_tokens += result.prompt_tokens;
        self.completion_tokens += result.completion_tokens;
        self.cost += result.cost;
    }
}

/// The final result of a scan, returned by [`crate::scan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutput {
    /// Wall-clock duration of the run in seconds.
    pub completion_time: f64,
    /// Where the assembled Markdown was written (`<output_dir>/<stem>.md`).
    pub output_path: PathBuf,
    /// The assembled (and optionally polished) document.
    pub markdown: String,
    /// Number of pages transcribed.
    pub page_count: usize,
    /// Total prompt tokens across all calls, polish included.
    pub prompt_tokens: u64,
    /// Total completion tokens across all calls, polish included.
    pub completion_tokens: u64,
    /// Total cost in USD.
    pub cost: f64,
    /// The accuracy mode the run was scheduled under.
    pub accuracy: Accuracy,
}
