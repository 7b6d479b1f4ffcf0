//! Ordered extraction rules.
//!
//! A field is located by a list of rules tried in priority order; the first rule that yields a value
//! wins. Each rule is a plain function over the parsed document so it can be tested on its own.

use super::text::element_text;
use scraper::{ElementRef, Html, Selector};

pub type Rule<T> = fn(&Html) -> Option<T>;

pub fn first_match<T>(doc: &Html, rules: &[Rule<T>]) -> Option<T> {
    rules.iter().find_map(|rule| rule(doc))
}

/// First element matching `css` anywhere in the document. Invalid selectors match nothing.
pub fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

pub fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// First descendant of `element` matching `css`
pub fn select_within<'a>(element: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    element.select(&selector).next()
}

/// Non-empty text of the first element matching `css`
pub fn select_text(doc: &Html, css: &str) -> Option<String> {
    select_first(doc, css)
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
}

/// CSS selector for `tag` elements whose inline style contains `fragment` verbatim
pub fn style_selector(tag: &str, fragment: &str) -> String {
    let escaped = fragment.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}[style*=\"{}\"]", tag, escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(doc: &Html) -> Option<String> {
        select_text(doc, "h1")
    }

    fn page_title(doc: &Html) -> Option<String> {
        select_text(doc, "title")
    }

    #[test]
    fn first_successful_rule_wins() {
        let doc = Html::parse_document("<html><head><title>Page</title></head><body><h1>Heading</h1></body></html>");
        assert_eq!(first_match(&doc, &[heading, page_title]), Some("Heading".to_string()));
        assert_eq!(first_match(&doc, &[page_title, heading]), Some("Page".to_string()));
    }

    #[test]
    fn falls_through_to_later_rules() {
        let doc = Html::parse_document("<html><head><title>Only title</title></head><body><h1> </h1></body></html>");
        assert_eq!(first_match(&doc, &[heading, page_title]), Some("Only title".to_string()));
        let empty: &[Rule<String>] = &[];
        assert_eq!(first_match(&doc, empty), None);
    }

    #[test]
    fn style_selector_matches_substring() {
        let doc = Html::parse_fragment(
            r#"<div style="color:#666A73; padding:3px 10px; font-size: 11px">x</div><div style="color:#000">y</div>"#,
        );
        let css = style_selector("div", "color:#666A73; padding:3px 10px;");
        assert_eq!(select_all(&doc, &css).len(), 1);
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let doc = Html::parse_fragment("<div>x</div>");
        assert!(select_first(&doc, "div:contains(").is_none());
        assert!(select_all(&doc, "[[").is_empty());
    }
}
