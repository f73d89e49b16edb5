//! Tolerant matchers over the result tables Vietlott renders server-side.
//!
//! Each level (row, cell, link/span) is a plain regex scan: the markup mixes
//! optional attributes, stray whitespace and inline children, so nothing here
//! tries to build a DOM. Callers treat an empty match as "skip this row".

use std::sync::LazyLock;

use regex::Regex;

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr(?:\s[^>]*)?>(.*?)</tr>").unwrap());
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td(?:\s[^>]*)?>(.*?)</td>").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a(?:\s[^>]*)?>([^<]+)</a>").unwrap());
static SPAN_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<span(?:\s[^>]*)?>\s*(\d+)\s*</span>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Inner HTML of every `<tr>` in document order.
pub fn rows(html: &str) -> impl Iterator<Item = &str> {
    ROW_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
}

/// Inner HTML of every `<td>` in a row. Header rows (`<th>` only) yield nothing.
pub fn cells(row: &str) -> Vec<&str> {
    CELL_RE
        .captures_iter(row)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Trimmed text of each `<a>` in a fragment.
pub fn link_texts(fragment: &str) -> Vec<String> {
    LINK_RE
        .captures_iter(fragment)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text content with tags removed and whitespace collapsed.
pub fn strip_tags(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, "");
    WS_RE.replace_all(text.trim(), " ").to_string()
}

/// Draw numbers inside `<span>` tags, falling back to whitespace-separated
/// integers in the cell text when the cell has no numeric spans.
pub fn numbers(cell: &str) -> Vec<u32> {
    let spans: Vec<u32> = SPAN_NUMBER_RE
        .captures_iter(cell)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    if !spans.is_empty() {
        return spans;
    }
    strip_tags(cell)
        .split_whitespace()
        .filter_map(|token| token.parse().ok())
        .collect()
}

/// Draw identifiers are sometimes rendered as `#0123456`.
pub fn draw_id(text: &str) -> String {
    text.trim().trim_start_matches('#').trim().to_string()
}
