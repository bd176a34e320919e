//! Integration tests for the page orchestrator and document assembler,
//! driven through the public API with scripted transcribers.

use async_trait::async_trait;
use autoscan::{
    join_pages, transcribe_pages, Accuracy, ContextPolicy, NoopObserver, PageContext, PageImage,
    PageTranscriber, ScanConfig, ScanObserver, TranscribeError, TranscriptionResult,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn pages(n: usize) -> Vec<PageImage> {
    (1..=n)
        .map(|i| PageImage {
            number: i,
            path: PathBuf::from(format!("page-{i:04}.png")),
        })
        .collect()
}

fn noop() -> Arc<dyn ScanObserver> {
    Arc::new(NoopObserver)
}

fn concurrent_config(bound: usize) -> ScanConfig {
    ScanConfig::builder()
        .accuracy(Accuracy::Low)
        .concurrency(bound)
        .build()
        .unwrap()
}

fn sequential_config(policy: ContextPolicy) -> ScanConfig {
    ScanConfig::builder()
        .accuracy(Accuracy::High)
        .context_policy(policy)
        .build()
        .unwrap()
}

/// Completes pages after per-page delays, so completion order can be forced
/// to differ from page order.
struct DelayedTranscriber {
    /// Delay in milliseconds for page number N at index N-1.
    delays_ms: Vec<u64>,
}

#[async_trait]
impl PageTranscriber for DelayedTranscriber {
    async fn transcribe(
        &self,
        page: &PageImage,
        _context: Option<&PageContext>,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let delay = self.delays_ms.get(page.number - 1).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(TranscriptionResult {
            content: format!("page {}", page.number),
            prompt_tokens: 10,
            completion_tokens: 5,
            cost: 0.0001,
        })
    }
}

/// Records the context passed with each call, keyed by page number.
struct ContextRecorder {
    seen: Mutex<Vec<(usize, Option<String>)>>,
}

#[async_trait]
impl PageTranscriber for ContextRecorder {
    async fn transcribe(
        &self,
        page: &PageImage,
        context: Option<&PageContext>,
    ) -> Result<TranscriptionResult, TranscribeError> {
        self.seen
            .lock()
            .unwrap()
            .push((page.number, context.map(|c| c.prior_markdown.clone())));
        Ok(TranscriptionResult {
            content: format!("markdown for page {}", page.number),
            prompt_tokens: 100,
            completion_tokens: 50,
            cost: 0.002,
        })
    }
}

/// Fails listed pages, succeeds on the rest.
struct SelectiveFailer {
    fail_pages: Vec<usize>,
}

#[async_trait]
impl PageTranscriber for SelectiveFailer {
    async fn transcribe(
        &self,
        page: &PageImage,
        _context: Option<&PageContext>,
    ) -> Result<TranscriptionResult, TranscribeError> {
        if self.fail_pages.contains(&page.number) {
            Err(TranscribeError::Api {
                message: format!("injected failure on page {}", page.number),
            })
        } else {
            Ok(TranscriptionResult {
                content: format!("page {}", page.number),
                prompt_tokens: 1,
                completion_tokens: 1,
                cost: 0.0,
            })
        }
    }
}

/// Gauges how many transcribe calls are in flight simultaneously.
struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl PageTranscriber for InFlightGauge {
    async fn transcribe(
        &self,
        page: &PageImage,
        _context: Option<&PageContext>,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(TranscriptionResult {
            content: format!("page {}", page.number),
            prompt_tokens: 1,
            completion_tokens: 1,
            cost: 0.0,
        })
    }
}

// ── Ordering ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_output_follows_page_order_not_completion_order() {
    // Page 1 finishes last, page 5 first.
    let transcriber = Arc::new(DelayedTranscriber {
        delays_ms: vec![80, 60, 40, 20, 1],
    });
    let pages = pages(5);

    let transcript = transcribe_pages(transcriber, &pages, &concurrent_config(5), &noop())
        .await
        .unwrap();

    assert_eq!(
        transcript.pages,
        vec!["page 1", "page 2", "page 3", "page 4", "page 5"]
    );
}

#[tokio::test]
async fn assembled_document_preserves_page_order_under_delays() {
    let transcriber = Arc::new(DelayedTranscriber {
        delays_ms: vec![30, 1, 15],
    });
    let pages = pages(3);

    let transcript = transcribe_pages(transcriber, &pages, &concurrent_config(3), &noop())
        .await
        .unwrap();
    let document = join_pages(&transcript.pages);

    assert_eq!(document, "page 1\n\npage 2\n\npage 3");
}

// ── Context chaining ─────────────────────────────────────────────────────

#[tokio::test]
async fn sequential_mode_chains_each_page_into_the_next() {
    let transcriber = Arc::new(ContextRecorder {
        seen: Mutex::new(Vec::new()),
    });
    let pages = pages(3);

    transcribe_pages(
        transcriber.clone(),
        &pages,
        &sequential_config(ContextPolicy::Full),
        &noop(),
    )
    .await
    .unwrap();

    let seen = transcriber.seen.lock().unwrap();
    assert_eq!(seen[0], (1, None));
    assert_eq!(seen[1], (2, Some("markdown for page 1".into())));
    assert_eq!(seen[2], (3, Some("markdown for page 2".into())));
}

#[tokio::test]
async fn tail_policy_bounds_the_chained_context() {
    let transcriber = Arc::new(ContextRecorder {
        seen: Mutex::new(Vec::new()),
    });
    let pages = pages(2);

    transcribe_pages(
        transcriber.clone(),
        &pages,
        &sequential_config(ContextPolicy::Tail(6)),
        &noop(),
    )
    .await
    .unwrap();

    let seen = transcriber.seen.lock().unwrap();
    // "markdown for page 1" → last 6 chars
    assert_eq!(seen[1].1.as_deref(), Some("page 1"));
}

#[tokio::test]
async fn concurrent_mode_never_passes_context() {
    let transcriber = Arc::new(ContextRecorder {
        seen: Mutex::new(Vec::new()),
    });
    let pages = pages(4);

    transcribe_pages(transcriber.clone(), &pages, &concurrent_config(2), &noop())
        .await
        .unwrap();

    assert!(transcriber
        .seen
        .lock()
        .unwrap()
        .iter()
        .all(|(_, ctx)| ctx.is_none()));
}

// ── Failure handling ─────────────────────────────────────────────────────

#[tokio::test]
async fn sequential_failure_aborts_and_names_the_page() {
    let transcriber = Arc::new(SelectiveFailer { fail_pages: vec![2] });
    let pages = pages(3);

    let err = transcribe_pages(
        transcriber,
        &pages,
        &sequential_config(ContextPolicy::Full),
        &noop(),
    )
    .await
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("page 2"), "got: {msg}");
    assert!(msg.contains("page-0002.png"), "got: {msg}");
}

#[tokio::test]
async fn concurrent_multi_failure_reports_the_lowest_page() {
    let transcriber = Arc::new(SelectiveFailer {
        fail_pages: vec![4, 2, 5],
    });
    let pages = pages(5);

    let err = transcribe_pages(transcriber, &pages, &concurrent_config(5), &noop())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("page 2"), "got: {err}");
}

#[tokio::test]
async fn empty_transcript_from_the_model_is_a_page_failure() {
    struct BlankTranscriber;

    #[async_trait]
    impl PageTranscriber for BlankTranscriber {
        async fn transcribe(
            &self,
            _page: &PageImage,
            _context: Option<&PageContext>,
        ) -> Result<TranscriptionResult, TranscribeError> {
            Ok(TranscriptionResult {
                content: "   \n ".into(),
                prompt_tokens: 1,
                completion_tokens: 0,
                cost: 0.0,
            })
        }
    }

    let err = transcribe_pages(
        Arc::new(BlankTranscriber),
        &pages(1),
        &concurrent_config(1),
        &noop(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("page 1"), "got: {err}");
}

// ── Concurrency bound ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_bound_caps_in_flight_calls() {
    let transcriber = Arc::new(InFlightGauge {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let pages = pages(12);

    transcribe_pages(transcriber.clone(), &pages, &concurrent_config(3), &noop())
        .await
        .unwrap();

    let peak = transcriber.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight was {peak}, bound is 3");
    assert!(peak >= 2, "bound never exercised (peak {peak})");
}

// ── Aggregation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn usage_is_summed_across_all_pages() {
    let transcriber = Arc::new(ContextRecorder {
        seen: Mutex::new(Vec::new()),
    });
    let pages = pages(5);

    let transcript = transcribe_pages(transcriber, &pages, &concurrent_config(2), &noop())
        .await
        .unwrap();

    assert_eq!(transcript.usage.prompt_tokens, 500);
    assert_eq!(transcript.usage.completion_tokens, 250);
    assert!((transcript.usage.cost - 0.01).abs() < 1e-9);
}

// ── Observer events ──────────────────────────────────────────────────────

#[tokio::test]
async fn observer_sees_every_page_exactly_once() {
    struct CountingObserver {
        starts: AtomicUsize,
        completes: AtomicUsize,
    }
    impl ScanObserver for CountingObserver {
        fn on_page_start(&self, _page: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_complete(&self, _p: usize, _t: usize, _pt: u64, _ct: u64, _c: f64) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    let observer = Arc::new(CountingObserver {
        starts: AtomicUsize::new(0),
        completes: AtomicUsize::new(0),
    });
    let dyn_observer: Arc<dyn ScanObserver> = observer.clone();

    let transcriber = Arc::new(DelayedTranscriber {
        delays_ms: vec![5, 1, 3, 2],
    });
    transcribe_pages(transcriber, &pages(4), &concurrent_config(4), &dyn_observer)
        .await
        .unwrap();

    assert_eq!(observer.starts.load(Ordering::SeqCst), 4);
    assert_eq!(observer.completes.load(Ordering::SeqCst), 4);
}

// ── Assembly ─────────────────────────────────────────────────────────────

#[test]
fn assembler_handles_the_table_boundary_cases() {
    // prose boundary
    assert_eq!(join_pages(&["a", "b"]), "a\n\nb");
    // table continuation
    assert_eq!(join_pages(&["| a |", "| b |"]), "| a |\n| b |");
    // only the right side is a table edge
    assert_eq!(join_pages(&["a", "| b |"]), "a\n\n| b |");
    // only the left side is a table edge
    assert_eq!(join_pages(&["| a |", "b"]), "| a |\n\nb");
}

#[test]
fn assembler_drops_blank_pages_without_stray_separators() {
    assert_eq!(join_pages(&["first", "", "   ", "last"]), "first\n\nlast");
    assert_eq!(join_pages::<&str>(&[]), "");
}
