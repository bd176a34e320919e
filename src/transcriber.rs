//! The LLM boundary: page transcription and document polishing.
//!
//! Two distinct capabilities, two distinct traits. Earlier designs funnelled
//! both through one polymorphic method with optional fields, which made it
//! ambiguous which arguments mattered for which call; here
//! [`PageTranscriber`] takes an image plus optional context, and
//! [`DocumentPolisher`] takes the joined document, and neither can be
//! confused for the other.
//!
//! [`VisionTranscriber`] and [`VisionPolisher`] are the production
//! implementations over an `edgequake-llm` provider. Cost is computed from
//! a static per-model pricing table since the API reports tokens only.

use crate::config::ScanConfig;
use crate::error::{AutoscanError, TranscribeError};
use crate::output::TranscriptionResult;
use crate::pipeline::{encode, postprocess};
use crate::pipeline::render::PageImage;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Model used when the caller specifies none.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Previous-page material handed to a sequential-mode transcription call.
///
/// Built by the orchestrator according to the configured
/// [`crate::config::ContextPolicy`]; `prior_markdown` is already shaped
/// (full text or tail) by the time it arrives here.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub prior_markdown: String,
    pub prior_image: Option<PathBuf>,
}

/// Converts one page image (plus optional prior-page context) to Markdown.
#[async_trait]
pub trait PageTranscriber: Send + Sync {
    async fn transcribe(
        &self,
        page: &PageImage,
        context: Option<&PageContext>,
    ) -> Result<TranscriptionResult, TranscribeError>;
}

/// Consolidates the whole joined document in a single call.
#[async_trait]
pub trait DocumentPolisher: Send + Sync {
    async fn polish(&self, document: &str) -> Result<TranscriptionResult, TranscribeError>;
}

// ── Production implementations ───────────────────────────────────────────

/// Page transcriber backed by a multimodal `edgequake-llm` provider.
pub struct VisionTranscriber {
    provider: Arc<dyn LLMProvider>,
    model: String,
    system_prompt: Option<String>,
    instructions: Option<String>,
    temperature: f32,
    max_tokens: usize,
}

impl VisionTranscriber {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, config: &ScanConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: config.system_prompt.clone(),
            instructions: config.instructions.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageTranscriber for VisionTranscriber {
    async fn transcribe(
        &self,
        page: &PageImage,
        context: Option<&PageContext>,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let system_prompt = self
            .system_prompt
            .as_deref()
            .unwrap_or(prompts::DEFAULT_SYSTEM_PROMPT);

        let mut messages = vec![ChatMessage::system(system_prompt)];

        if let Some(ctx) = context {
            if !ctx.prior_markdown.is_empty() {
                messages.push(ChatMessage::system(prompts::continuity_context(
                    &ctx.prior_markdown,
                )));
            }
        }

        let mut images: Vec<ImageData> = vec![encode::encode_image_file(&page.path)?];
        if let Some(prior_path) = context.and_then(|c| c.prior_image.as_deref()) {
            images.push(encode::encode_image_file(prior_path)?);
        }

        messages.push(ChatMessage::user_with_images(
            prompts::transcribe_user_text(self.instructions.as_deref()),
            images,
        ));

        debug!("Page {}: sending request to {}", page.number, self.model);

        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| TranscribeError::Api {
                message: format!("{e}"),
            })?;

        let content = postprocess::strip_code_fences(&response.content);
        let prompt_tokens = response.prompt_tokens as u64;
        let completion_tokens = response.completion_tokens as u64;

        Ok(TranscriptionResult {
            content,
            prompt_tokens,
            completion_tokens,
            cost: completion_cost(&self.model, prompt_tokens, completion_tokens),
        })
    }
}

/// Document polisher backed by an `edgequake-llm` provider.
pub struct VisionPolisher {
    provider: Arc<dyn LLMProvider>,
    model: String,
    instructions: Option<String>,
    max_tokens: usize,
}

impl VisionPolisher {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, config: &ScanConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            instructions: config.instructions.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl DocumentPolisher for VisionPolisher {
    async fn polish(&self, document: &str) -> Result<TranscriptionResult, TranscribeError> {
        let messages = vec![
            ChatMessage::system(prompts::POLISH_SYSTEM_PROMPT),
            ChatMessage::user(prompts::polish_user_text(
                document,
                self.instructions.as_deref(),
            )),
        ];

        let options = CompletionOptions {
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| TranscribeError::Api {
                message: format!("{e}"),
            })?;

        let content = postprocess::strip_code_fences(&response.content);
        let prompt_tokens = response.prompt_tokens as u64;
        let completion_tokens = response.completion_tokens as u64;

        Ok(TranscriptionResult {
            content,
            prompt_tokens,
            completion_tokens,
            cost: completion_cost(&self.model, prompt_tokens, completion_tokens),
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. Named provider + model from the config — reads the matching API key
///    (`OPENAI_API_KEY`, etc.) from the environment.
/// 2. `AUTOSCAN_PROVIDER` + `AUTOSCAN_MODEL` env pair, so a shell script or
///    CI job can pin the choice without touching config.
/// 3. OpenAI whenever `OPENAI_API_KEY` is present — users with several keys
///    get a deterministic default.
/// 4. Full auto-detection across all known API key variables.
pub fn resolve_provider(config: &ScanConfig) -> Result<Arc<dyn LLMProvider>, AutoscanError> {
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("AUTOSCAN_PROVIDER"),
        std::env::var("AUTOSCAN_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AutoscanError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from the environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass a provider name.\n\
                 Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AutoscanError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AutoscanError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

// ── Pricing ──────────────────────────────────────────────────────────────

/// USD per 1M tokens (input, output) for models with known pricing.
///
/// Unknown models cost 0.0 — token counts are still reported, so callers
/// can apply their own rates.
fn model_rates(model: &str) -> Option<(f64, f64)> {
    match model {
        "gpt-4o" => Some((2.50, 10.00)),
        "gpt-4o-mini" => Some((0.15, 0.60)),
        "gpt-4.1" => Some((2.00, 8.00)),
        "gpt-4.1-mini" => Some((0.40, 1.60)),
        "gpt-4.1-nano" => Some((0.10, 0.40)),
        "claude-sonnet-4-20250514" => Some((3.00, 15.00)),
        "claude-haiku-4-20250514" => Some((0.80, 4.00)),
        "gemini-2.0-flash" => Some((0.10, 0.40)),
        _ => None,
    }
}

/// Cost of one call in USD given its token usage.
pub fn completion_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let Some((input_rate, output_rate)) = model_rates(model) else {
        return 0.0;
    };
    (prompt_tokens as f64 / 1_000_000.0) * input_rate
        + (completion_tokens as f64 / 1_000_000.0) * output_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt_4o_cost_matches_rates() {
        // 1000 prompt tokens at $2.50/1M + 1000 completion at $10/1M
        let cost = completion_cost("gpt-4o", 1000, 1000);
        assert!((cost - 0.0125).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn unknown_model_costs_zero() {
        assert_eq!(completion_cost("mystery-model", 10_000, 10_000), 0.0);
    }

    #[test]
    fn zero_tokens_cost_zero() {
        assert_eq!(completion_cost("gpt-4o", 0, 0), 0.0);
    }

    #[test]
    fn cost_is_additive_in_tokens() {
        let a = completion_cost("gpt-4.1-nano", 500, 200);
        let b = completion_cost("gpt-4.1-nano", 300, 100);
        let both = completion_cost("gpt-4.1-nano", 800, 300);
        assert!((a + b - both).abs() < 1e-12);
    }
}
