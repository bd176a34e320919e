//! Page orchestration: scheduling, ordering, context chaining, aggregation.
//!
//! Two scheduling modes share one entry point, [`transcribe_pages`]:
//!
//! * **Sequential** ([`Accuracy::High`]): pages run one at a time, each call
//!   carrying the previous page's Markdown (shaped by the configured
//!   [`ContextPolicy`]) so tables and lists continue cleanly across page
//!   breaks. The context dependency chain is why this mode cannot be
//!   parallelised.
//!
//! * **Concurrent** ([`Accuracy::Low`]): pages run independently under a
//!   concurrency bound, with no cross-page context. Results are written into
//!   index-addressed slots, so the assembled order is the page order no
//!   matter which call finishes first.
//!
//! Any page failure is fatal for the run. The error wraps the page number
//! and image path around the underlying cause; when several concurrent
//! pages fail, the lowest page number is surfaced so the report is
//! deterministic.

use crate::config::{Accuracy, ContextPolicy, ScanConfig};
use crate::error::{AutoscanError, TranscribeError};
use crate::output::{TranscriptionResult, UsageTotals};
use crate::pipeline::render::PageImage;
use crate::progress::ScanObserver;
use crate::transcriber::{PageContext, PageTranscriber};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Ordered per-page Markdown plus the run's aggregated usage.
#[derive(Debug, Clone)]
pub struct Transcript {
    /// One Markdown string per transcribed page, in page order.
    pub pages: Vec<String>,
    /// Token and cost totals summed over all page calls.
    pub usage: UsageTotals,
}

/// Transcribe all rendered pages according to the configured accuracy mode.
///
/// Returns per-page Markdown in page order. An empty `pages` slice yields an
/// empty transcript without invoking the transcriber.
pub async fn transcribe_pages(
    transcriber: Arc<dyn PageTranscriber>,
    pages: &[PageImage],
    config: &ScanConfig,
    observer: &Arc<dyn ScanObserver>,
) -> Result<Transcript, AutoscanError> {
    if pages.is_empty() {
        return Ok(Transcript {
            pages: Vec::new(),
            usage: UsageTotals::default(),
        });
    }

    if config.accuracy.is_sequential() {
        transcribe_sequential(transcriber, pages, config.context_policy, observer).await
    } else {
        transcribe_concurrent(transcriber, pages, config, observer).await
    }
}

/// Sequential mode: one page at a time, context chained from the previous
/// page's output.
async fn transcribe_sequential(
    transcriber: Arc<dyn PageTranscriber>,
    pages: &[PageImage],
    policy: ContextPolicy,
    observer: &Arc<dyn ScanObserver>,
) -> Result<Transcript, AutoscanError> {
    let total = pages.len();
    let mut results: Vec<String> = Vec::with_capacity(total);
    let mut usage = UsageTotals::default();
    let mut previous: Option<(&PageImage, String)> = None;

    info!("Transcribing {} pages sequentially ({:?})", total, Accuracy::High);

    for page in pages {
        observer.on_page_start(page.number, total);

        let context = previous
            .as_ref()
            .map(|(prev_page, prev_markdown)| build_context(prev_page, prev_markdown, policy));

        let result = transcriber
            .transcribe(page, context.as_ref())
            .await
            .and_then(require_content)
            .map_err(|source| {
                observer.on_page_failed(page.number, total, &source.to_string());
                AutoscanError::PageFailed {
                    page: page.number,
                    path: page.path.clone(),
                    source,
                }
            })?;

        usage.record(&result);
        observer.on_page_complete(
            page.number,
            total,
            result.prompt_tokens,
            result.completion_tokens,
            result.cost,
        );
        debug!(
            "Page {}/{} done ({} chars)",
            page.number,
            total,
            result.content.len()
        );

        previous = Some((page, result.content.clone()));
        results.push(result.content);
    }

    Ok(Transcript {
        pages: results,
        usage,
    })
}

/// Concurrent mode: independent pages under a concurrency bound, results
/// slotted by index.
async fn transcribe_concurrent(
    transcriber: Arc<dyn PageTranscriber>,
    pages: &[PageImage],
    config: &ScanConfig,
    observer: &Arc<dyn ScanObserver>,
) -> Result<Transcript, AutoscanError> {
    let total = pages.len();
    let bound = config.effective_concurrency(total);

    info!(
        "Transcribing {} pages concurrently (bound {})",
        total, bound
    );

    let outcomes: Vec<(usize, Result<TranscriptionResult, TranscribeError>)> =
        stream::iter(pages.iter().enumerate().map(|(idx, page)| {
            let transcriber = Arc::clone(&transcriber);
            let observer = Arc::clone(observer);
            async move {
                observer.on_page_start(page.number, total);
                let outcome = transcriber
                    .transcribe(page, None)
                    .await
                    .and_then(require_content);
                match &outcome {
                    Ok(result) => observer.on_page_complete(
                        page.number,
                        total,
                        result.prompt_tokens,
                        result.completion_tokens,
                        result.cost,
                    ),
                    Err(e) => observer.on_page_failed(page.number, total, &e.to_string()),
                }
                (idx, outcome)
            }
        }))
        .buffer_unordered(bound)
        .collect()
        .await;

    // Slot by index so completion order never affects page order; surface
    // the lowest-numbered failure so the reported error is deterministic.
    let mut slots: Vec<Option<TranscriptionResult>> = (0..total).map(|_| None).collect();
    let mut first_failure: Option<(usize, TranscribeError)> = None;

    for (idx, outcome) in outcomes {
        match outcome {
            Ok(result) => slots[idx] = Some(result),
            Err(source) => {
                if first_failure.as_ref().map_or(true, |(i, _)| idx < *i) {
                    first_failure = Some((idx, source));
                }
            }
        }
    }

    if let Some((idx, source)) = first_failure {
        return Err(AutoscanError::PageFailed {
            page: pages[idx].number,
            path: pages[idx].path.clone(),
            source,
        });
    }

    let mut usage = UsageTotals::default();
    let mut results = Vec::with_capacity(total);
    for slot in slots {
        // Every slot is filled: no failure was recorded above.
        let result = slot.ok_or_else(|| {
            AutoscanError::Internal("concurrent transcription lost a page result".into())
        })?;
        usage.record(&result);
        results.push(result.content);
    }

    Ok(Transcript {
        pages: results,
        usage,
    })
}

/// Shape the previous page's output into context per the policy.
fn build_context(prev_page: &PageImage, prev_markdown: &str, policy: ContextPolicy) -> PageContext {
    let prior_markdown = match policy.tail_chars() {
        None => prev_markdown.to_string(),
        Some(n) => tail(prev_markdown, n),
    };
    let prior_image = policy
        .includes_image()
        .then(|| prev_page.path.clone());

    PageContext {
        prior_markdown,
        prior_image,
    }
}

/// Last `n` characters of `s`, split on a character boundary.
fn tail(s: &str, n: usize) -> String {
    let count = s.chars().count();
    if count <= n {
        s.to_string()
    } else {
        s.chars().skip(count - n).collect()
    }
}

/// Reject whitespace-only transcripts at the orchestrator boundary.
fn require_content(
    result: TranscriptionResult,
) -> Result<TranscriptionResult, TranscribeError> {
    if result.content.trim().is_empty() {
        Err(TranscribeError::EmptyTranscript)
    } else {
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn page(n: usize) -> PageImage {
        PageImage {
            number: n,
            path: PathBuf::from(format!("page-{n:04}.png")),
        }
    }

    /// Returns canned content per page and records received contexts.
    struct ScriptedTranscriber {
        contexts: Mutex<Vec<Option<String>>>,
        fail_on: Option<usize>,
    }

    impl ScriptedTranscriber {
        fn new() -> Self {
            Self {
                contexts: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }
        fn failing_on(page: usize) -> Self {
            Self {
                contexts: Mutex::new(Vec::new()),
                fail_on: Some(page),
            }
        }
    }

    #[async_trait]
    impl PageTranscriber for ScriptedTranscriber {
        async fn transcribe(
            &self,
            page: &PageImage,
            context: Option<&PageContext>,
        ) -> Result<TranscriptionResult, TranscribeError> {
            self.contexts
                .lock()
                .unwrap()
                .push(context.map(|c| c.prior_markdown.clone()));

            if self.fail_on == Some(page.number) {
                return Err(TranscribeError::Api {
                    message: "scripted failure".into(),
                });
            }

            Ok(TranscriptionResult {
                content: format!("content of page {}", page.number),
                prompt_tokens: 100,
                completion_tokens: 10,
                cost: 0.001,
            })
        }
    }

    fn sequential_config() -> ScanConfig {
        ScanConfig {
            accuracy: Accuracy::High,
            context_policy: ContextPolicy::Full,
            ..ScanConfig::default()
        }
    }

    #[tokio::test]
    async fn sequential_chains_context() {
        let transcriber = Arc::new(ScriptedTranscriber::new());
        let pages = vec![page(1), page(2), page(3)];
        let observer: Arc<dyn ScanObserver> = Arc::new(crate::progress::NoopObserver);

        let transcript = transcribe_pages(
            transcriber.clone(),
            &pages,
            &sequential_config(),
            &observer,
        )
        .await
        .unwrap();

        assert_eq!(transcript.pages.len(), 3);
        let contexts = transcriber.contexts.lock().unwrap();
        assert_eq!(contexts[0], None);
        assert_eq!(contexts[1].as_deref(), Some("content of page 1"));
        assert_eq!(contexts[2].as_deref(), Some("content of page 2"));
    }

    #[tokio::test]
    async fn concurrent_pages_get_no_context() {
        let transcriber = Arc::new(ScriptedTranscriber::new());
        let pages = vec![page(1), page(2), page(3)];
        let observer: Arc<dyn ScanObserver> = Arc::new(crate::progress::NoopObserver);

        let transcript =
            transcribe_pages(transcriber.clone(), &pages, &ScanConfig::default(), &observer)
                .await
                .unwrap();

        assert_eq!(
            transcript.pages,
            vec![
                "content of page 1".to_string(),
                "content of page 2".to_string(),
                "content of page 3".to_string(),
            ]
        );
        assert!(transcriber
            .contexts
            .lock()
            .unwrap()
            .iter()
            .all(|c| c.is_none()));
    }

    #[tokio::test]
    async fn page_failure_is_fatal_and_names_the_page() {
        let transcriber = Arc::new(ScriptedTranscriber::failing_on(2));
        let pages = vec![page(1), page(2), page(3)];
        let observer: Arc<dyn ScanObserver> = Arc::new(crate::progress::NoopObserver);

        let err = transcribe_pages(transcriber, &pages, &sequential_config(), &observer)
            .await
            .unwrap_err();

        match err {
            AutoscanError::PageFailed { page, path, .. } => {
                assert_eq!(page, 2);
                assert_eq!(path, PathBuf::from("page-0002.png"));
            }
            other => panic!("expected PageFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn usage_totals_sum_over_pages() {
        let transcriber = Arc::new(ScriptedTranscriber::new());
        let pages = vec![page(1), page(2), page(3), page(4)];
        let observer: Arc<dyn ScanObserver> = Arc::new(crate::progress::NoopObserver);

        let transcript =
            transcribe_pages(transcriber, &pages, &ScanConfig::default(), &observer)
                .await
                .unwrap();

        assert_eq!(transcript.usage.prompt_tokens, 400);
        assert_eq!(transcript.usage.completion_tokens, 40);
        assert!((transcript.usage.cost - 0.004).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_input_is_an_empty_transcript() {
        let transcriber = Arc::new(ScriptedTranscriber::new());
        let observer: Arc<dyn ScanObserver> = Arc::new(crate::progress::NoopObserver);

        let transcript = transcribe_pages(transcriber, &[], &ScanConfig::default(), &observer)
            .await
            .unwrap();

        assert!(transcript.pages.is_empty());
        assert_eq!(transcript.usage, UsageTotals::default());
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail("hello", 10), "hello");
        assert_eq!(tail("hello", 3), "llo");
        // multibyte: é is 2 bytes but 1 char
        assert_eq!(tail("café", 2), "fé");
    }

    #[test]
    fn context_policy_shapes_prior_markdown() {
        let p = page(1);
        let full = build_context(&p, "abcdef", ContextPolicy::Full);
        assert_eq!(full.prior_markdown, "abcdef");
        assert!(full.prior_image.is_none());

        let tail = build_context(&p, "abcdef", ContextPolicy::Tail(3));
        assert_eq!(tail.prior_markdown, "def");

        let with_image = build_context(&p, "abcdef", ContextPolicy::TailWithImage(4));
        assert_eq!(with_image.prior_markdown, "cdef");
        assert_eq!(with_image.prior_image.as_deref(), Some(p.path.as_path()));
    }

    #[test]
    fn whitespace_only_transcript_is_rejected() {
        let result = TranscriptionResult {
            content: "  \n\t ".into(),
            prompt_tokens: 1,
            completion_tokens: 1,
            cost: 0.0,
        };
        assert!(matches!(
            require_content(result),
            Err(TranscribeError::EmptyTranscript)
        ));
    }
}
