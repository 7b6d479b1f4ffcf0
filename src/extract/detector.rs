//! Event-shaped object detection over arbitrary JSON.
//!
//! API responses and embedded page data come in shapes that change without notice, so instead of
//! reading fixed paths the detector walks the whole tree and keeps every mapping that structurally
//! resembles an event: a title plus enough event-like keys, or a title that reads like an event.
//! False positives and negatives are expected and left to the caller.

use super::text::truncate_chars;
use crate::common::constants::NOT_AVAILABLE;
use crate::common::types::{EventRecord, Site};
use serde_json::{Map, Value};

pub const TITLE_KEYS: [&str; 4] = ["title", "name", "displayName", "eventName"];
pub const EVENT_FIELD_KEYS: [&str; 8] = [
    "date",
    "startDate",
    "endDate",
    "location",
    "venue",
    "price",
    "description",
    "slug",
];
pub const EVENT_TERMS: [&str; 5] = ["session", "experience", "event", "summit", "conference"];

const MIN_EVENT_FIELDS: usize = 2;
const LOCATION_KEYS: [&str; 4] = ["location", "venue", "address", "city"];
const START_DATE_KEYS: [&str; 3] = ["startDate", "date", "eventDate"];
const END_DATE_KEYS: [&str; 1] = ["endDate"];
const DESCRIPTION_KEYS: [&str; 2] = ["description", "summary"];
pub const DESCRIPTION_LIMIT: usize = 500;

/// Finds event-shaped mappings in a JSON tree and turns each into an [`EventRecord`]
#[derive(Debug, Clone)]
pub struct EventDetector {
    site: Site,
    slug_url_prefix: String,
}

impl EventDetector {
    /// `slug_url_prefix` is prepended to a node's `slug` to build its URL
    pub fn new(site: Site, slug_url_prefix: impl Into<String>) -> Self {
        Self {
            site,
            slug_url_prefix: slug_url_prefix.into(),
        }
    }

    /// Detector for WeBook payloads, where slugs live under `/en/experiences/`
    pub fn webook(base_url: &str) -> Self {
        Self::new(
            Site::WeBook,
            format!("{}/en/experiences/", base_url.trim_end_matches('/')),
        )
    }

    /// Depth-first walk: a mapping's own record comes before those of its children.
    /// Nested matches inside a matched mapping are kept as well.
    pub fn detect(&self, value: &Value) -> Vec<EventRecord> {
        match value {
            Value::Object(map) => self
                .extract(map)
                .into_iter()
                .chain(map.values().flat_map(|child| self.detect(child)))
                .collect(),
            Value::Array(items) => items.iter().flat_map(|item| self.detect(item)).collect(),
            _ => Vec::new(),
        }
    }

    /// Record for a single mapping, or `None` when it does not look like an event
    pub fn extract(&self, map: &Map<String, Value>) -> Option<EventRecord> {
        if !looks_like_event(map) {
            return None;
        }

        let mut record = EventRecord::new(self.site);
        record.name = title_of(map)?.to_string();
        record.location = location_of(map).unwrap_or_else(na);
        record.start_date = first_scalar(map, &START_DATE_KEYS).unwrap_or_else(na);
        record.end_date = first_scalar(map, &END_DATE_KEYS).unwrap_or_else(na);
        record.price = price_of(map).unwrap_or_else(na);
        record.description = first_scalar(map, &DESCRIPTION_KEYS)
            .map(|d| truncate_chars(&d, DESCRIPTION_LIMIT))
            .unwrap_or_else(na);
        record.url = self.url_of(map).unwrap_or_else(na);
        Some(record)
    }

    fn url_of(&self, map: &Map<String, Value>) -> Option<String> {
        if let Some(slug) = map.get("slug").and_then(scalar_text) {
            return Some(format!("{}{}", self.slug_url_prefix, slug));
        }
        map.get("url").and_then(scalar_text)
    }
}

/// A mapping looks like an event when it has a non-empty title and either
/// at least two event-like keys or an event-like word in the title
pub fn looks_like_event(map: &Map<String, Value>) -> bool {
    let Some(title) = title_of(map) else {
        return false;
    };

    let event_fields = EVENT_FIELD_KEYS
        .iter()
        .filter(|key| map.contains_key(**key))
        .count();
    if event_fields >= MIN_EVENT_FIELDS {
        return true;
    }

    let title = title.to_lowercase();
    EVENT_TERMS.iter().any(|term| title.contains(term))
}

fn title_of(map: &Map<String, Value>) -> Option<&str> {
    TITLE_KEYS.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
    })
}

fn location_of(map: &Map<String, Value>) -> Option<String> {
    for key in LOCATION_KEYS {
        match map.get(key) {
            Some(Value::String(s)) => return Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Some(value @ Value::Object(inner)) => {
                return inner
                    .get("name")
                    .and_then(scalar_text)
                    .or_else(|| inner.get("city").and_then(scalar_text))
                    .or_else(|| Some(value.to_string()));
            }
            _ => continue,
        }
    }
    None
}

fn price_of(map: &Map<String, Value>) -> Option<String> {
    match map.get("price")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(inner) => inner
            .get("amount")
            .and_then(scalar_text)
            .or_else(|| inner.get("value").and_then(scalar_text)),
        _ => None,
    }
}

fn first_scalar(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(scalar_text))
}

/// Text of a string, number or boolean; `None` for empty strings, null and containers
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn na() -> String {
    NOT_AVAILABLE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn title_alone_is_not_enough() {
        assert!(!looks_like_event(&as_map(json!({"title": "Padel Court"}))));
        assert!(!looks_like_event(&as_map(json!({"title": "Padel Court", "slug": "padel"}))));
    }

    #[test]
    fn empty_or_non_string_title_is_rejected() {
        assert!(!looks_like_event(&as_map(json!({"title": "", "date": "x", "venue": "y"}))));
        assert!(!looks_like_event(&as_map(json!({"name": 42, "date": "x", "venue": "y"}))));
    }

    #[test]
    fn later_title_key_is_used_when_earlier_is_blank() {
        let map = as_map(json!({"title": " ", "eventName": "Riyadh Season Conference"}));
        assert!(looks_like_event(&map));
        let record = EventDetector::webook("https://webook.com").extract(&map).unwrap();
        assert_eq!(record.name, "Riyadh Season Conference");
    }

    #[test]
    fn price_shapes() {
        let detector = EventDetector::webook("https://webook.com");
        let numeric = as_map(json!({"title": "Event A", "price": 150}));
        let nested = as_map(json!({"title": "Event B", "price": {"value": 99.5}}));
        let amount_first = as_map(json!({"title": "Event C", "price": {"amount": "75", "value": 1}}));

        assert_eq!(detector.extract(&numeric).unwrap().price, "150");
        assert_eq!(detector.extract(&nested).unwrap().price, "99.5");
        assert_eq!(detector.extract(&amount_first).unwrap().price, "75");
    }

    #[test]
    fn location_mapping_without_name_or_city_is_stringified() {
        let map = as_map(json!({"title": "Event", "venue": {"lat": 24.7}}));
        let record = EventDetector::webook("https://webook.com").extract(&map).unwrap();
        assert_eq!(record.location, r#"{"lat":24.7}"#);
    }

    #[test]
    fn description_is_truncated() {
        let long = "a".repeat(DESCRIPTION_LIMIT + 50);
        let map = as_map(json!({"title": "Event", "summary": long}));
        let record = EventDetector::webook("https://webook.com").extract(&map).unwrap();
        assert_eq!(record.description.len(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn url_falls_back_to_url_key() {
        let map = as_map(json!({"title": "Event", "url": "https://webook.com/en/events/x"}));
        let record = EventDetector::webook("https://webook.com/").extract(&map).unwrap();
        assert_eq!(record.url, "https://webook.com/en/events/x");
    }
}
