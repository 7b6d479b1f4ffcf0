use crate::common::error::{Result, ScraperError};
use crate::common::types::{is_available, EventRecord, EventSource, Site};
use crate::config::EyeOfRiyadhConfig;
use crate::extract::rules::{select_all, select_within, style_selector};
use crate::extract::text::{collapse_whitespace, element_text, or_sentinel};
use crate::extract::resolve_url;
use crate::infra::{pause, ScrapeContext};
use reqwest::Url;
use scraper::{ElementRef, Html};
use tracing::{debug, info, instrument, warn};

// Inline styles the listing uses for each part of an event block
const BLOCK_STYLE: &str = "margin-bottom:25px; display: block; padding: 10px; border-bottom:1px solid #ADB0B6;";
const DATE_STYLE: &str = "color:#666A73; padding:0px 10px 3px 10px;";
const NAME_CONTAINER_STYLE: &str = "color:#666A73; padding:3px 10px;";
const NAME_LINK_STYLE: &str = "color:#000; font-weight:700; font-size:12px;letter-spacing: 0px; line-height:18px;";
const VENUE_STYLE: &str = "color:#ADB0B6;padding:0px 10px 10px 10px";
const DESCRIPTION_STYLE: &str = "color:#666A73; margin-bottom:10px;";
/// Detail pages put the long description in a light grey box
const DETAIL_BOX_STYLE: &str = "fafafa";

pub struct EyeOfRiyadhCrawler {
    config: EyeOfRiyadhConfig,
}

impl EyeOfRiyadhCrawler {
    pub fn new(config: EyeOfRiyadhConfig) -> Self {
        Self { config }
    }

    /// `{base}/events/`, against which listing links are resolved
    pub fn events_base(&self) -> Result<Url> {
        let base = format!("{}/events/", self.config.base_url.trim_end_matches('/'));
        Url::parse(&base)
            .map_err(|e| ScraperError::Config(format!("Invalid EyeOfRiyadh base URL '{}': {}", base, e)))
    }

    pub fn search_url(&self, events_base: &Url) -> Result<String> {
        let mut url = events_base
            .join("index.php")
            .map_err(|e| ScraperError::Config(format!("Invalid EyeOfRiyadh search URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("s", &self.config.query)
            .append_pair("search_post_type", "place")
            .append_pair("fcity", "")
            .append_pair("fcat", "")
            .append_pair("count", "")
            .append_pair("sort-by", "")
            .append_pair("sort", "");
        Ok(url.to_string())
    }

    async fn fill_detailed_descriptions(&self, ctx: &ScrapeContext, events: &mut [EventRecord]) {
        let total = events.len();
        for (i, record) in events.iter_mut().enumerate() {
            if !is_available(&record.url) {
                continue;
            }
            pause(self.config.delay_ms).await;
            debug!("Fetching detail page {}/{}: {}", i + 1, total, record.url);

            if let Some(page) = ctx.fetcher.fetch_page(&record.url).await {
                ctx.dumps.save("eyeofriyadh_detail", &page.url, &page.body);
                record.detailed_description = or_sentinel(parse_detail_description(&page.body));
            }
        }
    }
}

#[async_trait::async_trait]
impl EventSource for EyeOfRiyadhCrawler {
    fn site(&self) -> Site {
        Site::EyeOfRiyadh
    }

    #[instrument(skip(self, ctx))]
    async fn get_event_list(&self, ctx: &ScrapeContext) -> Result<Vec<EventRecord>> {
        let events_base = self.events_base()?;
        let search_url = self.search_url(&events_base)?;
        info!("Attempting to scrape events from: {}", search_url);

        let Some(page) = ctx.fetcher.fetch_page(&search_url).await else {
            return Ok(Vec::new());
        };
        ctx.dumps.save("eyeofriyadh_search", &page.url, &page.body);

        let mut events = parse_listing(&page.body, &events_base);
        if events.is_empty() {
            warn!("No event blocks found with the expected styling. The site's HTML structure might have changed.");
            return Ok(events);
        }

        if self.config.follow_details {
            self.fill_detailed_descriptions(ctx, &mut events).await;
        }

        info!("Successfully scraped {} events from EyeOfRiyadh", events.len());
        Ok(events)
    }
}

/// One record per styled listing block
pub fn parse_listing(html: &str, events_base: &Url) -> Vec<EventRecord> {
    let document = Html::parse_document(html);
    select_all(&document, &style_selector("div", BLOCK_STYLE))
        .iter()
        .map(|block| parse_block(block, events_base))
        .collect()
}

fn parse_block(block: &ElementRef, events_base: &Url) -> EventRecord {
    let mut record = EventRecord::new(Site::EyeOfRiyadh);

    record.start_date = or_sentinel(styled_text(block, DATE_STYLE));
    record.description = or_sentinel(styled_text(block, DESCRIPTION_STYLE));
    record.venue = or_sentinel(
        select_within(block, &style_selector("div", VENUE_STYLE)).map(|el| venue_text(&el)),
    );

    let name_link = select_within(block, &style_selector("div", NAME_CONTAINER_STYLE))
        .and_then(|container| select_within(&container, &style_selector("a", NAME_LINK_STYLE)));
    if let Some(link) = name_link {
        record.name = or_sentinel(Some(element_text(&link)));
        if let Some(href) = link.value().attr("href").filter(|h| !h.trim().is_empty()) {
            record.url = resolve_url(events_base, href).unwrap_or_else(|| href.trim().to_string());
        }
    }

    record
}

fn styled_text(block: &ElementRef, style: &str) -> Option<String> {
    select_within(block, &style_selector("div", style)).map(|el| element_text(&el))
}

/// Venue cells are padded with tabs and non-breaking spaces
fn venue_text(element: &ElementRef) -> String {
    let raw: String = element.text().collect();
    collapse_whitespace(&raw.replace(['\t', '\u{a0}'], ""))
}

/// Longest text among the detail page's description boxes
pub fn parse_detail_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    select_all(&document, "div[style]")
        .into_iter()
        .filter(|div| {
            div.value()
                .attr("style")
                .is_some_and(|style| style.to_lowercase().contains(DETAIL_BOX_STYLE))
        })
        .map(|div| element_text(&div))
        .filter(|text| !text.is_empty())
        .max_by_key(|text| text.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EyeOfRiyadhConfig;

    #[test]
    fn search_url_carries_query() {
        let crawler = EyeOfRiyadhCrawler::new(EyeOfRiyadhConfig {
            query: "Riyadh Expo".into(),
            ..EyeOfRiyadhConfig::default()
        });
        let base = crawler.events_base().unwrap();
        assert_eq!(base.as_str(), "https://www.eyeofriyadh.com/events/");
        assert_eq!(
            crawler.search_url(&base).unwrap(),
            "https://www.eyeofriyadh.com/events/index.php?s=Riyadh+Expo&search_post_type=place&fcity=&fcat=&count=&sort-by=&sort="
        );
    }

    #[test]
    fn detail_description_picks_longest_grey_box() {
        let html = r#"
            <div style="background:#FAFAFA; padding:5px">Short</div>
            <div style="background: #fafafa;">The Smart Ports and Logistics Summit is a two-day conference in Jeddah.</div>
            <div style="color:red">Not a description box at all, even though it is long enough to win.</div>
        "#;
        assert_eq!(
            parse_detail_description(html).as_deref(),
            Some("The Smart Ports and Logistics Summit is a two-day conference in Jeddah.")
        );
        assert_eq!(parse_detail_description("<p>nothing</p>"), None);
    }
}
