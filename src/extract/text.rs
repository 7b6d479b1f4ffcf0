use crate::common::constants::NOT_AVAILABLE;
use scraper::ElementRef;

/// Visible text of an element, whitespace collapsed
pub fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the element's own text nodes only, ignoring descendants
pub fn own_text(element: &ElementRef) -> String {
    let own: Vec<&str> = element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect();
    collapse_whitespace(&own.join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters, never splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Truncate with a trailing ellipsis when the text is longer than `max_chars`
pub fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", truncate_chars(text, max_chars))
    } else {
        text.to_string()
    }
}

pub fn or_sentinel(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
