//! Deterministic cleanup of raw model output.
//!
//! Models routinely wrap their answer in ` ```markdown … ``` ` fences even
//! when the prompt says not to. Stripping the fence here, at the transcriber
//! boundary, keeps the prompt focused on what to extract and makes the rule
//! independently testable.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\n?(.*?)\n?```$").unwrap());

/// Remove enclosing triple backticks (and an optional `markdown`/`md`
/// language tag) when the entire response is fenced. Internal whitespace
/// and indentation are preserved.
pub fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        assert_eq!(
            strip_code_fences("```markdown\n# Hello\nWorld\n```"),
            "# Hello\nWorld"
        );
        assert_eq!(strip_code_fences("```md\n# Hi\n```"), "# Hi");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n# Hello\nWorld\n```"), "# Hello\nWorld");
    }

    #[test]
    fn unfenced_content_passes_through() {
        assert_eq!(strip_code_fences("# Hello\nWorld"), "# Hello\nWorld");
    }

    #[test]
    fn inner_fences_are_preserved() {
        let input = "```markdown\nText\n```rust\nfn main() {}\n```\n```";
        let out = strip_code_fences(input);
        assert!(out.contains("```rust"), "got: {out}");
        assert!(out.contains("fn main()"));
    }

    #[test]
    fn indentation_survives() {
        let input = "```markdown\n- item\n    - nested\n```";
        assert_eq!(strip_code_fences(input), "- item\n    - nested");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(strip_code_fences("  # Title  \n"), "# Title");
    }
}
