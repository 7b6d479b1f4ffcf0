//! JavaScript bundle scanning: which scripts a page loads and which API paths they mention.

use super::links::resolve_url;
use super::rules::select_all;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::Html;
use std::collections::BTreeSet;

static ABSOLUTE_API_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["'`](https?://[^"'`\s]*(?:api|graphql|contentful)[^"'`\s]*)["'`]"#).expect("static regex")
});
static RELATIVE_API_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["'`](/(?:api/[^"'`\s]*|graphql[^"'`\s]*|v\d+/[^"'`\s]+))["'`]"#).expect("static regex")
});
static ASSIGNED_BASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:baseURL|apiUrl|endpoint)\s*[:=]\s*["'`]([^"'`\s]+)["'`]"#).expect("static regex")
});

/// Asset suffixes that show up next to API-looking paths but never answer with data
const ASSET_SUFFIXES: &[&str] = &[".js", ".css", ".png", ".jpg", ".svg", ".woff", ".woff2", ".map"];

/// Absolute URLs of `script[src]` and `link[rel=modulepreload]` tags, in page order
pub fn script_sources(doc: &Html, base: &Url) -> Vec<String> {
    let scripts = select_all(doc, "script[src]")
        .into_iter()
        .filter_map(|s| s.value().attr("src"));
    let preloads = select_all(doc, r#"link[rel="modulepreload"][href]"#)
        .into_iter()
        .filter_map(|l| l.value().attr("href"));

    let mut seen = BTreeSet::new();
    scripts
        .chain(preloads)
        .filter_map(|src| resolve_url(base, src))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// API-looking URLs and paths quoted in a bundle. Paths keep their leading slash.
pub fn endpoints_in_bundle(js: &str) -> BTreeSet<String> {
    let captures = [&*ABSOLUTE_API_URL, &*RELATIVE_API_PATH, &*ASSIGNED_BASE]
        .into_iter()
        .flat_map(|re| re.captures_iter(js).filter_map(|c| c.get(1)).map(|m| m.as_str()));

    captures
        .map(|s| s.trim_end_matches('/'))
        .filter(|s| s.len() > 4)
        .filter(|s| s.starts_with('/') || s.starts_with("http://") || s.starts_with("https://"))
        .filter(|s| {
            let lower = s.to_lowercase();
            !ASSET_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
        })
        .map(str::to_string)
        .collect()
}
