use super::rules::select_all;
use regex::Regex;
use reqwest::Url;
use scraper::Html;
use serde_json::Value;
use std::collections::BTreeSet;

/// Which anchors count as event links
#[derive(Debug, Clone)]
pub struct LinkFilter<'a> {
    /// The absolute URL must contain at least one of these
    pub contains: &'a [&'a str],
    /// And, when set, must match this pattern
    pub pattern: Option<&'a Regex>,
}

impl LinkFilter<'_> {
    pub fn accepts(&self, url: &str) -> bool {
        self.contains.iter().any(|needle| url.contains(needle))
            && self.pattern.map_or(true, |re| re.is_match(url))
    }
}

/// Resolve `href` against `base`. Fragments, `javascript:` and `mailto:` links are dropped.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:") {
        return None;
    }
    base.join(href).ok().map(|url| url.to_string())
}

/// Host without a leading `www.`, so `https://www.meetup.com` and `https://meetup.com` share one domain
pub fn site_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Deduplicated absolute URLs of every anchor accepted by `filter`
pub fn extract_links(doc: &Html, base: &Url, filter: &LinkFilter) -> BTreeSet<String> {
    select_all(doc, "a[href]")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_url(base, href))
        .filter(|url| filter.accepts(url))
        .collect()
}

/// Every string value in a JSON tree accepted by `filter`
pub fn collect_json_urls(value: &Value, filter: &LinkFilter) -> Vec<String> {
    match value {
        Value::String(s) if filter.accepts(s) => vec![s.clone()],
        Value::Object(map) => map.values().flat_map(|v| collect_json_urls(v, filter)).collect(),
        Value::Array(items) => items.iter().flat_map(|v| collect_json_urls(v, filter)).collect(),
        _ => Vec::new(),
    }
}
