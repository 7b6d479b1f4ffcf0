use crate::common::constants::MEETUP_DOMAIN;
use crate::common::error::{Result, ScraperError};
use crate::common::types::{is_available, EventRecord, EventSource, Site};
use crate::config::MeetupConfig;
use crate::extract::embedded::embedded_json;
use crate::extract::links::collect_json_urls;
use crate::extract::rules::{first_match, select_all, select_first, select_text, Rule};
use crate::extract::text::{element_text, or_sentinel, own_text, shorten};
use crate::extract::{extract_links, site_domain, LinkFilter};
use crate::infra::{pause, ScrapeContext};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

const SHORT_DESCRIPTION_CHARS: usize = 200;
const MIN_TITLE_CHARS: usize = 3;

static EVENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/events/\d+").expect("static regex"));
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("static regex"));
static CITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Riyadh|Jeddah|Makkah|Dammam|Khobar|Medina)").expect("static regex"));
static ATTENDEES: Lazy<Regex> = Lazy::new(|| Regex::new(r"Attendees?\s*\((\d+)\)").expect("static regex"));
static MEETUP_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\|\s*Meetup\s*$").expect("static regex"));
static NEEDS_LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Needs a location").expect("static regex"));
static ONLINE_EVENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Online event").expect("static regex"));
static LOCATION_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)location").expect("static regex"));

pub struct MeetupCrawler {
    config: MeetupConfig,
}

impl MeetupCrawler {
    pub fn new(config: MeetupConfig) -> Self {
        Self { config }
    }

    /// Four search URL shapes per city, plus the country-coded Makkah search
    pub fn search_urls(&self) -> Vec<String> {
        let base = self.config.base_url.trim_end_matches('/');
        let country = &self.config.country;

        let mut urls: Vec<String> = self
            .config
            .cities
            .iter()
            .flat_map(|city| {
                [
                    format!("{base}/find/?location={city}--{country}&source=EVENTS"),
                    format!("{base}/find/?location={city}&source=EVENTS"),
                    format!("{base}/find/?eventType=inPerson&location={city}--{country}"),
                    format!("{base}/find/?eventType=online&location={city}--{country}"),
                ]
            })
            .collect();
        urls.push(format!("{base}/find/?location=sa--Makkah&source=EVENTS"));
        urls
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&self.config.base_url).map_err(|e| {
            ScraperError::Config(format!("Invalid Meetup base URL '{}': {}", self.config.base_url, e))
        })
    }

    async fn collect_event_links(&self, ctx: &ScrapeContext, base: &Url) -> BTreeSet<String> {
        let mut all_links = BTreeSet::new();

        for (i, search_url) in self.search_urls().iter().enumerate() {
            if i > 0 {
                pause(self.config.search_delay_ms).await;
            }
            info!("Searching: {}", search_url);

            let Some(page) = ctx.fetcher.fetch_page(search_url).await else {
                continue;
            };
            ctx.dumps.save("meetup_search", &page.url, &page.body);

            let links = extract_event_links(&page.body, base);
            info!("Found {} event links from {}", links.len(), search_url);
            all_links.extend(links);
        }

        all_links
    }
}

#[async_trait::async_trait]
impl EventSource for MeetupCrawler {
    fn site(&self) -> Site {
        Site::Meetup
    }

    #[instrument(skip(self, ctx))]
    async fn get_event_list(&self, ctx: &ScrapeContext) -> Result<Vec<EventRecord>> {
        let base = self.base_url()?;
        let links = self.collect_event_links(ctx, &base).await;
        info!("Total unique event links found: {}", links.len());

        if links.is_empty() {
            warn!("No event links found. The search markup may have changed, results may be geo-restricted, or the listing needs client-side rendering.");
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for (i, link) in links.iter().enumerate() {
            if i > 0 {
                pause(self.config.detail_delay_ms).await;
            }
            info!("Processing event {}/{}: {}", i + 1, links.len(), link);

            let Some(page) = ctx.fetcher.fetch_page(link).await else {
                continue;
            };
            let record = parse_event_page(&page.body, link);
            info!("Extracted: {} | {} | {}", record.name, record.city, record.start_date);
            events.push(record);
        }

        info!("Successfully extracted {} events from Meetup", events.len());
        Ok(events)
    }

    fn should_skip(&self, record: &EventRecord) -> (bool, String) {
        if !record.has_name() {
            return (true, format!("Skipping event with missing name: {}", record.url));
        }
        (false, String::new())
    }
}

/// Event links from a search page: anchors, `application/json` payloads and inline client state
pub fn extract_event_links(html: &str, base: &Url) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    // Registrable domain, so links on both meetup.com and www.meetup.com qualify
    let domain = site_domain(base).unwrap_or_else(|| MEETUP_DOMAIN.to_string());

    let anchor_filter = LinkFilter {
        contains: &["/events/"],
        pattern: Some(&*EVENT_ID),
    };
    let mut links = extract_links(&document, base, &anchor_filter);

    let domain_needle = [domain.as_str()];
    let json_filter = LinkFilter {
        contains: &domain_needle,
        pattern: Some(&*EVENT_ID),
    };
    for value in embedded_json(html, &document) {
        links.extend(collect_json_urls(&value, &json_filter));
    }

    match Regex::new(&format!(
        r#"https?://(?:[\w-]+\.)*{}/[^"'\s\\]+/events/\d+[^"'\s\\]*"#,
        regex::escape(&domain)
    )) {
        Ok(script_url) => {
            for script in select_all(&document, "script") {
                let body: String = script.text().collect();
                if body.contains("__NEXT_DATA__") || body.contains("window.__") {
                    links.extend(script_url.find_iter(&body).map(|m| m.as_str().to_string()));
                }
            }
        }
        Err(e) => debug!("Could not build script URL pattern for {}: {}", domain, e),
    }

    links
}

/// Extract every field a Meetup event page offers; missing fields stay at the sentinel
pub fn parse_event_page(html: &str, url: &str) -> EventRecord {
    let doc = Html::parse_document(html);
    let mut record = EventRecord::new(Site::Meetup);
    record.url = url.to_string();

    if let Some(name) = first_match(&doc, NAME_RULES) {
        record.full_name = name.clone();
        record.name = name;
    }

    let (date, date_time) = date_and_time(&doc);
    record.start_date = or_sentinel(date);
    record.date_time = or_sentinel(date_time);

    if let Some(venue) = first_match(&doc, VENUE_RULES) {
        record.city = or_sentinel(city_of(&venue));
        record.venue = venue;
    }

    if let Some(description) = first_match(&doc, DESCRIPTION_RULES) {
        record.description = shorten(&description, SHORT_DESCRIPTION_CHARS);
        record.detailed_description = description;
    }

    if let Some(organizer) = organizer(&doc) {
        if !record.detailed_description.to_lowercase().contains("organizer") {
            append_detail(&mut record, &format!("Organizer: {}", organizer));
        }
    }
    if let Some(count) = attendee_count(&doc) {
        append_detail(&mut record, &format!("Attendees: {}", count));
    }

    record
}

pub const NAME_RULES: &[Rule<String>] = &[name_from_heading, name_from_test_id, name_from_class, name_from_page_title];
pub const VENUE_RULES: &[Rule<String>] = &[
    venue_from_location_test_id,
    venue_from_venue_test_id,
    venue_needs_location,
    venue_online_event,
    venue_mentions_location,
];
pub const DESCRIPTION_RULES: &[Rule<String>] = &[
    description_from_event_details,
    description_from_test_id,
    description_from_class,
    description_from_break_words,
    description_after_details_heading,
];

fn long_enough(text: String) -> Option<String> {
    (text.chars().count() > MIN_TITLE_CHARS).then_some(text)
}

pub fn name_from_heading(doc: &Html) -> Option<String> {
    select_text(doc, "h1").and_then(long_enough)
}

pub fn name_from_test_id(doc: &Html) -> Option<String> {
    select_text(doc, r#"[data-testid*="title"]"#).and_then(long_enough)
}

pub fn name_from_class(doc: &Html) -> Option<String> {
    select_text(doc, ".event-title").and_then(long_enough)
}

/// `<title>` without the trailing "| Meetup"
pub fn name_from_page_title(doc: &Html) -> Option<String> {
    select_text(doc, "title")
        .map(|title| MEETUP_SUFFIX.replace(&title, "").trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Machine date from a `datetime` attribute, overridden by visible text when present.
/// The ISO day is kept as the date whenever the attribute has one.
fn date_and_time(doc: &Html) -> (Option<String>, Option<String>) {
    let Some(element) = ["time[datetime]", r#"[data-testid*="time"]"#, r#"[data-testid*="date"]"#]
        .iter()
        .find_map(|css| select_first(doc, css))
    else {
        return (None, None);
    };

    let mut date = None;
    let mut date_time = None;
    if let Some(attr) = element.value().attr("datetime").map(str::trim).filter(|a| !a.is_empty()) {
        date_time = Some(attr.to_string());
        date = ISO_DATE.find(attr).map(|m| m.as_str().to_string());
    }

    let text = element_text(&element);
    if !text.is_empty() {
        if date.is_none() {
            date = text.split_whitespace().next().map(str::to_string);
        }
        date_time = Some(text);
    }

    (date, date_time)
}

pub fn venue_from_location_test_id(doc: &Html) -> Option<String> {
    select_text(doc, r#"[data-testid*="location"]"#)
}

pub fn venue_from_venue_test_id(doc: &Html) -> Option<String> {
    select_text(doc, r#"[data-testid*="venue"]"#)
}

fn div_with_own_text(doc: &Html, pattern: &Regex) -> Option<String> {
    select_all(doc, "div")
        .into_iter()
        .find(|div| pattern.is_match(&own_text(div)))
        .map(|div| element_text(&div))
        .filter(|text| !text.is_empty())
}

pub fn venue_needs_location(doc: &Html) -> Option<String> {
    div_with_own_text(doc, &NEEDS_LOCATION)
}

pub fn venue_online_event(doc: &Html) -> Option<String> {
    div_with_own_text(doc, &ONLINE_EVENT)
}

pub fn venue_mentions_location(doc: &Html) -> Option<String> {
    div_with_own_text(doc, &LOCATION_WORD)
}

pub fn city_of(venue: &str) -> Option<String> {
    CITY.captures(venue)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| venue.contains("Saudi Arabia").then(|| "Saudi Arabia".to_string()))
}

/// Paragraph-level text of a description container, deduplicated, one block per line
fn description_text(element: &ElementRef) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse("p, li, div") {
        for part in element.select(&selector) {
            let text = element_text(&part);
            if !text.is_empty() && !parts.contains(&text) {
                parts.push(text);
            }
        }
    }

    if parts.is_empty() {
        Some(element_text(element)).filter(|t| !t.is_empty())
    } else {
        Some(parts.join("\n"))
    }
}

fn description_at(doc: &Html, css: &str) -> Option<String> {
    select_first(doc, css).and_then(|el| description_text(&el))
}

pub fn description_from_event_details(doc: &Html) -> Option<String> {
    description_at(doc, "#event-details")
}

pub fn description_from_test_id(doc: &Html) -> Option<String> {
    description_at(doc, r#"[data-testid*="description"]"#)
}

pub fn description_from_class(doc: &Html) -> Option<String> {
    description_at(doc, ".event-description")
}

pub fn description_from_break_words(doc: &Html) -> Option<String> {
    description_at(doc, "div.break-words")
}

/// The first `div` after an `h2` reading "Details"
pub fn description_after_details_heading(doc: &Html) -> Option<String> {
    let heading = select_all(doc, "h2")
        .into_iter()
        .find(|h2| element_text(h2) == "Details")?;
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
        .and_then(|div| description_text(&div))
}

fn organizer(doc: &Html) -> Option<String> {
    let element = [r#"a[href*="/members/"]"#, ".organizer-name", r#"[data-testid*="group"]"#]
        .iter()
        .find_map(|css| select_first(doc, css))?;
    Some(element_text(&element)).filter(|t| !t.is_empty())
}

fn attendee_count(doc: &Html) -> Option<String> {
    let text = doc.root_element().text().collect::<Vec<_>>().join(" ");
    ATTENDEES
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn append_detail(record: &mut EventRecord, line: &str) {
    if is_available(&record.detailed_description) {
        record.detailed_description.push_str("\n\n");
        record.detailed_description.push_str(line);
    } else {
        record.detailed_description = line.to_string();
    }
}
