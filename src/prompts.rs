//! System prompts and context-message builders.
//!
//! Centralising every prompt here keeps a single source of truth and lets
//! unit tests inspect prompts without a live model. Callers can override
//! the transcription prompt via [`crate::config::ScanConfig::system_prompt`].

/// Sentinel the continuity context is wrapped in. Models occasionally echo
/// it back; the assembler strips any occurrence before joining pages.
pub const PAGE_BREAK_SENTINEL: &str = "<!-- PAGE SEPARATOR -->";

/// Default system prompt for converting a page image to Markdown.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Convert the PDF page image to clean, well-structured Markdown. Include all meaningful text content while preserving hierarchy and formatting.

Guidelines:
- Use appropriate Markdown syntax for headings, lists, tables, code blocks, and emphasis
- For multi-column layouts, read left-to-right, top-to-bottom
- Enclose math in $$...$$
- Skip page numbers and repetitive headers/footers
- For images and charts, provide detailed descriptions in blockquotes:
  > **Image Description**: [detailed explanation]

Continuity (when previous page context is provided):
- Tables: if continuing a table without new headers, provide only data rows (no headers or separators)
- Lists: maintain consistent numbering and preserve exact indentation for nested items
- Text: ensure natural flow from the previous page

Output only the Markdown content, no explanations."#;

/// System prompt for the whole-document polish pass.
pub const POLISH_SYSTEM_PROMPT: &str = r#"You are consolidating a Markdown document that was generated from individual PDF pages. Merge content split across page boundaries, reconstruct broken tables, eliminate duplicated headers, footers, and page artifacts, and improve the document's structure and flow. Preserve all original information. Output only the consolidated Markdown, no explanations."#;

/// Build the continuity-context message for sequential mode.
///
/// Sent as an additional system message ahead of the page image. The prior
/// markdown is wrapped in [`PAGE_BREAK_SENTINEL`] so the boundary between
/// the instruction and the quoted page is unambiguous to the model.
pub fn continuity_context(prior_markdown: &str) -> String {
    format!(
        "Here is the previous page's markdown for continuity context. \
         Do NOT repeat any content from the previous page. If a table \
         continues across pages, provide only data rows (no headers, no \
         separator rows). Ensure seamless continuation without duplicating \
         previous content.\n{PAGE_BREAK_SENTINEL}\n{prior_markdown}"
    )
}

/// User-message text for a page transcription call.
pub fn transcribe_user_text(instructions: Option<&str>) -> String {
    match instructions {
        Some(extra) if !extra.trim().is_empty() => {
            format!("Convert the following image to markdown.\n\nAdditional instructions: {extra}")
        }
        _ => "Convert the following image to markdown.".to_string(),
    }
}

/// User-message text for the polish call, carrying the full document.
pub fn polish_user_text(document: &str, instructions: Option<&str>) -> String {
    let mut text = format!(
        "Please consolidate, clean up, and reorganize the following Markdown \
         document that was generated from individual PDF pages:\n\n{document}"
    );
    if let Some(extra) = instructions {
        if !extra.trim().is_empty() {
            text.push_str("\n\nAdditional instructions: ");
            text.push_str(extra);
        }
    }
    text
}
