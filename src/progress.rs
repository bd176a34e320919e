//! Observer trait for per-page scan events.
//!
//! The core emits structured events (page started, page completed with
//! metrics, page failed, run summary) through an injected
//! `Arc<dyn ScanObserver>` instead of writing directly to a process-wide
//! log. The orchestrator stays testable without capturing log output, and
//! hosts can forward events to a progress bar, a channel, or a database
//! without the library knowing how.
//!
//! All methods have default no-op implementations so callers only override
//! what they care about. Implementations must be `Send + Sync`: in
//! concurrent mode the page events fire from whichever task finished.

use crate::output::UsageTotals;
use std::sync::Arc;

/// Called by the scan pipeline as it processes each page.
pub trait ScanObserver: Send + Sync {
    /// Called once after rendering, before any transcription call.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page's transcription call is issued.
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page transcribed successfully, with that call's metrics.
    fn on_page_complete(
        &self,
        page: usize,
        total_pages: usize,
        prompt_tokens: u64,
        completion_tokens: u64,
        cost: f64,
    ) {
        let _ = (page, total_pages, prompt_tokens, completion_tokens, cost);
    }

    /// Called when a page's transcription failed. The run ends after this.
    fn on_page_failed(&self, page: usize, total_pages: usize, error: &str) {
        let _ = (page, total_pages, error);
    }

    /// Called when the optional polish pass failed (non-fatal; the run
    /// continues with the unpolished document).
    fn on_polish_failed(&self, error: &str) {
        let _ = error;
    }

    /// Called once when the run finished successfully.
    fn on_run_complete(&self, total_pages: usize, usage: &UsageTotals, elapsed_secs: f64) {
        let _ = (total_pages, usage, elapsed_secs);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ScanConfig`].
pub type Observer = Arc<dyn ScanObserver>;
