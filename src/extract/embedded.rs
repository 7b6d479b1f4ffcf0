//! JSON embedded in HTML pages: client-side state blobs, `application/json` scripts, JSON-LD and
//! small object literals inside inline scripts.

use super::rules::select_all;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::{Map, Value};
use tracing::debug;

/// Assignments or keys after which a JSON object literal starts
static STATE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"window\.__INITIAL_STATE__\s*=\s*",
        r"window\.__DATA__\s*=\s*",
        r"window\.__APOLLO_STATE__\s*=\s*",
        r#""props"\s*:\s*"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Flat object literals that mention a title-ish key
static INLINE_OBJECT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"\{[^{}]*(?:"(?:title|name|event)")[^{}]*\}"#).ok());

const INLINE_SCRIPT_KEYWORDS: [&str; 4] = ["event", "experience", "fast fit", "session"];

/// Every JSON document embedded in the page, in page order: state assignments first, then
/// `application/json` script bodies (which include `__NEXT_DATA__`)
pub fn embedded_json(html: &str, doc: &Html) -> Vec<Value> {
    let mut found = Vec::new();

    for marker in STATE_MARKERS.iter() {
        for m in marker.find_iter(html) {
            match json_value_at(&html[m.end()..]) {
                Some(value) if is_state_blob(marker.as_str(), &value) => found.push(value),
                _ => debug!("Marker {} not followed by usable JSON", marker.as_str()),
            }
        }
    }

    for script in select_all(doc, r#"script[type="application/json"]"#) {
        let body = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
            found.push(value);
        }
    }

    found
}

/// First JSON-LD node typed `Event`. A top-level list is searched element by element.
pub fn json_ld_event(doc: &Html) -> Option<Map<String, Value>> {
    select_all(doc, r#"script[type="application/ld+json"]"#)
        .into_iter()
        .filter_map(|script| serde_json::from_str::<Value>(script.text().collect::<String>().trim()).ok())
        .flat_map(|value| match value {
            Value::Array(items) => items,
            other => vec![other],
        })
        .find_map(|value| match value {
            Value::Object(map) if is_event_type(map.get("@type")) => Some(map),
            _ => None,
        })
}

/// Small flat objects inside inline scripts that talk about events
pub fn inline_script_objects(doc: &Html) -> Vec<Map<String, Value>> {
    let Some(object_re) = INLINE_OBJECT.as_ref() else {
        return Vec::new();
    };

    select_all(doc, "script")
        .into_iter()
        .map(|script| script.text().collect::<String>())
        .filter(|body| {
            let lower = body.to_lowercase();
            INLINE_SCRIPT_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .flat_map(|body| {
            object_re
                .find_iter(&body)
                .filter_map(|m| match serde_json::from_str::<Value>(m.as_str()) {
                    Ok(Value::Object(map)) => Some(map),
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parse the first JSON value at the start of `text`, ignoring whatever follows it
fn json_value_at(text: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()?
        .ok()
}

fn is_state_blob(marker: &str, value: &Value) -> bool {
    match value {
        Value::Object(map) if marker.contains("props") => map.contains_key("pageProps"),
        Value::Object(_) => true,
        _ => false,
    }
}

fn is_event_type(type_value: Option<&Value>) -> bool {
    match type_value {
        Some(Value::String(t)) => t == "Event",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Event")),
        _ => false,
    }
}
