//! Document assembly: deterministic joining of per-page Markdown.
//!
//! Pure string work, no I/O and no model calls. Each page is cleaned
//! (sentinel echoes removed, trailing whitespace trimmed), empty pages are
//! dropped, and adjacent pages are joined with a separator chosen by a
//! table-continuation heuristic: a page ending in `|` followed by a page
//! starting with `|` is a table split across a page break, and a blank line
//! between the halves would break the table in most Markdown renderers.

use crate::prompts::PAGE_BREAK_SENTINEL;

/// Join cleaned page transcripts into one Markdown document.
///
/// Pages that are empty after cleaning are dropped entirely, so a blank
/// page contributes no stray separator. Joining zero pages yields the empty
/// string.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let cleaned: Vec<String> = pages
        .iter()
        .map(|p| clean_page(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect();

    let mut document = String::new();
    for (i, page) in cleaned.iter().enumerate() {
        if i > 0 {
            document.push_str(separator(&cleaned[i - 1], page));
        }
        document.push_str(page);
    }
    document
}

/// Remove sentinel echoes and trailing whitespace from one page.
fn clean_page(page: &str) -> String {
    page.replace(PAGE_BREAK_SENTINEL, "").trim_end().to_string()
}

/// `"\n"` when a table continues across the boundary, `"\n\n"` otherwise.
fn separator(prev: &str, next: &str) -> &'static str {
    if prev.ends_with('|') && next.trim_start().starts_with('|') {
        "\n"
    } else {
        "\n\n"
    }
}
