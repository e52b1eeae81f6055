//! Utility functions and helpers.

pub mod http;

use scraper::Html;
use unicode_segmentation::UnicodeSegmentation;

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Truncate text to at most `max` graphemes, appending [`ELLIPSIS`] when
/// anything was cut.
pub fn truncate(text: &str, max: usize) -> String {
    let mut graphemes = text.grapheme_indices(true);
    match graphemes.nth(max) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Reduce HTML/XML markup to its whitespace-normalized text content.
pub fn markup_to_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let text: Vec<&str> = fragment.root_element().text().collect();
    normalize_whitespace(&text.join(" "))
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a comma-separated query value into trimmed components.
///
/// A missing or blank value yields `None` (no constraint).
pub fn split_csv(value: Option<&str>) -> Option<Vec<String>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.split(',').map(|s| s.trim().to_string()).collect())
}
