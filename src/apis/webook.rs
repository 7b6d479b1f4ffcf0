use crate::common::error::{Result, ScraperError};
use crate::common::types::{EventRecord, EventSource, Site};
use crate::config::WeBookConfig;
use crate::extract::embedded::{embedded_json, inline_script_objects, json_ld_event};
use crate::extract::rules::select_text;
use crate::extract::text::or_sentinel;
use crate::extract::{endpoints_in_bundle, extract_links, script_sources, site_domain, EventDetector, LinkFilter};
use crate::infra::{pause, FetchedPage, ScrapeContext};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::Html;
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument, warn};

/// Header sets tried in turn when probing an endpoint for JSON
const HEADER_VARIATIONS: [&[(&str, &str)]; 4] = [
    // Standard API headers
    &[
        ("Accept", "application/json"),
        ("Content-Type", "application/json"),
        ("X-Requested-With", "XMLHttpRequest"),
    ],
    // AJAX-style headers
    &[
        ("Accept", "application/json, text/javascript, */*; q=0.01"),
        ("X-Requested-With", "XMLHttpRequest"),
        ("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8"),
    ],
    // GraphQL headers
    &[
        ("Accept", "application/json"),
        ("Content-Type", "application/json"),
        ("Apollo-Require-Preflight", "true"),
    ],
    // Basic fetch headers
    &[
        ("Accept", "*/*"),
        ("Sec-Fetch-Mode", "cors"),
        ("Sec-Fetch-Dest", "empty"),
    ],
];

/// Upper bound on endpoints taken from script bundles; each one costs up to nine requests
const MAX_DISCOVERED_ENDPOINTS: usize = 10;

static DETAIL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:experiences|events)/[^/?#]+").expect("static regex"));
static CITY_IN_COUNTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(Riyadh|Jeddah|Al Khobar|Dammam).*?Saudi Arabia").expect("static regex")
});
static CITY_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Riyadh|Jeddah|Al Khobar|Dammam)").expect("static regex"));
static PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*(?:SAR|SR|ريال)").expect("static regex"));

pub struct WeBookCrawler {
    config: WeBookConfig,
    detector: EventDetector,
}

impl WeBookCrawler {
    pub fn new(config: WeBookConfig) -> Self {
        let detector = EventDetector::webook(&config.base_url);
        Self { config, detector }
    }

    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
        }
    }

    pub fn search_url(&self) -> Result<Url> {
        let raw = self.absolute("/en/search");
        let mut url = Url::parse(&raw)
            .map_err(|e| ScraperError::Config(format!("Invalid WeBook base URL '{}': {}", raw, e)))?;
        url.query_pairs_mut().append_pair("q", &self.config.query);
        Ok(url)
    }

    /// Bodies sent with each POST attempt
    pub fn post_payloads(&self) -> Vec<Value> {
        let query = &self.config.query;
        vec![
            json!({}),
            json!({ "query": query }),
            json!({ "search": query }),
            json!({ "country": "SA" }),
            json!({ "location": "Saudi Arabia" }),
        ]
    }

    /// Try GET with every header variation, then POST with every payload.
    /// Returns the first JSON document; HTML answers are kept in `pages` for later analysis.
    async fn query_endpoint(
        &self,
        ctx: &ScrapeContext,
        endpoint: &str,
        pages: &mut PageSet,
    ) -> Option<Value> {
        for (i, headers) in HEADER_VARIATIONS.iter().enumerate() {
            let label = format!("GET_variation_{}", i + 1);
            match ctx.fetcher.get_with_headers(endpoint, headers).await {
                Ok(page) => {
                    if let Some(value) = self.accept_response(ctx, &label, page, pages) {
                        info!("Got JSON from {} with header variation {}", endpoint, i + 1);
                        return Some(value);
                    }
                }
                Err(e) => debug!("GET {} with header variation {} failed: {}", endpoint, i + 1, e),
            }
        }

        for payload in self.post_payloads() {
            let label = format!("POST_{}", payload);
            match ctx.fetcher.post_json(endpoint, &payload).await {
                Ok(page) => {
                    if let Some(value) = self.accept_response(ctx, &label, page, pages) {
                        info!("Got JSON from {} with POST payload {}", endpoint, payload);
                        return Some(value);
                    }
                }
                Err(e) => debug!("POST {} with payload {} failed: {}", endpoint, payload, e),
            }
        }

        None
    }

    fn accept_response(
        &self,
        ctx: &ScrapeContext,
        label: &str,
        page: FetchedPage,
        pages: &mut PageSet,
    ) -> Option<Value> {
        if page.is_json() {
            match page.json() {
                Ok(value) => return Some(value),
                Err(e) => debug!("{} claimed JSON but did not parse: {}", page.url, e),
            }
        }
        ctx.dumps.save(label, &page.url, &page.body);
        pages.push(page);
        None
    }

    async fn scrape_api_endpoints(
        &self,
        ctx: &ScrapeContext,
        endpoints: &[String],
        pages: &mut PageSet,
    ) -> Vec<EventRecord> {
        let mut events = Vec::new();
        for endpoint in endpoints {
            info!("Trying API calls for: {}", endpoint);
            if let Some(value) = self.query_endpoint(ctx, endpoint, pages).await {
                let found = self.detector.detect(&value);
                info!("Detected {} event-shaped objects in {}", found.len(), endpoint);
                events.extend(found);
            }
        }
        events
    }

    /// Fetch the search page, falling back to a browser render when it links to no experiences
    async fn search_page(&self, ctx: &ScrapeContext, pages: &mut PageSet) -> Result<SearchPage> {
        let search_url = self.search_url()?;
        info!("Searching: {}", search_url);

        let mut search = SearchPage::default();
        if let Some(page) = ctx.fetcher.fetch_page(search_url.as_str()).await {
            ctx.dumps.save("webook_search", &page.url, &page.body);
            search.links = extract_detail_links(&page.body, &search_url);
            search.scripts = bundle_urls(&page.body, &search_url);
            pages.push(page);
        }
        info!("Found {} experience links on the search page", search.links.len());

        if search.links.is_empty() && ctx.browser.is_enabled() {
            info!("Rendering the search page in the browser");
            if let Some(html) = ctx.browser.render(search_url.as_str()).await {
                ctx.dumps.save("webook_search_rendered", search_url.as_str(), &html);
                search.links = extract_detail_links(&html, &search_url);
                info!("Rendered search page links to {} experiences", search.links.len());
                pages.push(FetchedPage {
                    url: search_url.to_string(),
                    status: 200,
                    content_type: "text/html".to_string(),
                    body: html,
                });
            }
        }
        Ok(search)
    }

    /// API endpoints named in the page's script bundles, minus the configured ones
    async fn discover_endpoints(&self, ctx: &ScrapeContext, scripts: &[String]) -> Vec<String> {
        let configured: HashSet<String> = self.config.api_endpoints.iter().map(|e| self.absolute(e)).collect();
        let domain = Url::parse(&self.config.base_url).ok().and_then(|u| site_domain(&u));
        let bundles = &scripts[..scripts.len().min(self.config.script_bundle_limit)];

        let mut discovered = BTreeSet::new();
        for script in bundles {
            let bundle = match ctx.fetcher.get(script).await {
                Ok(page) => page,
                Err(e) => {
                    debug!("Script bundle {} not fetched: {}", script, e);
                    continue;
                }
            };
            for candidate in endpoints_in_bundle(&bundle.body) {
                if let Some(url) = self.endpoint_url(&candidate, domain.as_deref()) {
                    if !configured.contains(&url) {
                        discovered.insert(url);
                    }
                }
            }
        }

        if discovered.len() > MAX_DISCOVERED_ENDPOINTS {
            debug!("Keeping {} of {} discovered endpoints", MAX_DISCOVERED_ENDPOINTS, discovered.len());
        }
        let discovered: Vec<String> = discovered.into_iter().take(MAX_DISCOVERED_ENDPOINTS).collect();
        info!("Discovered {} API endpoints in {} script bundles", discovered.len(), bundles.len());
        discovered
    }

    /// Absolute endpoint for a bundle candidate. Other hosts are dropped unless they share the site domain.
    fn endpoint_url(&self, candidate: &str, domain: Option<&str>) -> Option<String> {
        if candidate.starts_with('/') {
            return Some(self.absolute(candidate));
        }
        let url = Url::parse(candidate).ok()?;
        let host = url.host_str()?;
        let domain = domain?;
        (host == domain || host.ends_with(&format!(".{domain}"))).then(|| candidate.to_string())
    }

    async fn scrape_detail_pages(
        &self,
        ctx: &ScrapeContext,
        urls: &[String],
        pages: &mut PageSet,
    ) -> Vec<EventRecord> {
        let mut events = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                pause(self.config.delay_ms).await;
            }
            info!("Fetching: {}", url);

            let Some(page) = ctx.fetcher.fetch_page(url).await else {
                continue;
            };
            ctx.dumps.save("known_url", &page.url, &page.body);

            if let Some(record) = extract_event_from_page(&page.body, url) {
                info!("Extracted event: {}", record.name);
                events.push(record);
            }
            pages.push(page);
        }
        events
    }
}

#[async_trait::async_trait]
impl EventSource for WeBookCrawler {
    fn site(&self) -> Site {
        Site::WeBook
    }

    #[instrument(skip(self, ctx))]
    async fn get_event_list(&self, ctx: &ScrapeContext) -> Result<Vec<EventRecord>> {
        let mut pages = PageSet::default();

        // Step 1: search page, its experience links and the scripts it loads
        let search = self.search_page(ctx, &mut pages).await?;

        // Step 2: configured JSON endpoints plus those named in the script bundles
        let mut endpoints: Vec<String> = self.config.api_endpoints.iter().map(|e| self.absolute(e)).collect();
        endpoints.extend(self.discover_endpoints(ctx, &search.scripts).await);
        let mut all_events = self.scrape_api_endpoints(ctx, &endpoints, &mut pages).await;

        // Step 3: known detail pages plus whatever the search page links to
        let mut detail_urls: Vec<String> = self.config.known_paths.iter().map(|p| self.absolute(p)).collect();
        for link in search.links {
            if !detail_urls.contains(&link) {
                detail_urls.push(link);
            }
        }
        all_events.extend(self.scrape_detail_pages(ctx, &detail_urls, &mut pages).await);

        // Step 4: data embedded in every HTML page seen so far
        info!("Analyzing {} HTML responses for embedded data", pages.len());
        for page in pages.iter() {
            all_events.extend(events_from_embedded(&page.body, &self.detector));
        }

        let events = dedupe(all_events);
        if events.is_empty() && ctx.dumps.is_enabled() {
            warn!("No events found on WeBook. The saved responses show what the server returned.");
        } else if events.is_empty() {
            warn!("No events found on WeBook. Rerun with --dump-dir to inspect what the server returned.");
        } else {
            info!("Total unique events found: {}", events.len());
        }
        Ok(events)
    }
}

#[derive(Default)]
struct SearchPage {
    links: BTreeSet<String>,
    scripts: Vec<String>,
}

/// HTML bodies collected during a run, each kept once
#[derive(Default)]
struct PageSet {
    pages: Vec<FetchedPage>,
    seen: HashSet<String>,
}

impl PageSet {
    fn push(&mut self, page: FetchedPage) {
        if self.seen.insert(page.body.clone()) {
            self.pages.push(page);
        }
    }

    fn len(&self) -> usize {
        self.pages.len()
    }

    fn iter(&self) -> impl Iterator<Item = &FetchedPage> {
        self.pages.iter()
    }
}

pub fn extract_detail_links(html: &str, base: &Url) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let filter = LinkFilter {
        contains: &["/experiences/", "/events/"],
        pattern: Some(&*DETAIL_LINK),
    };
    extract_links(&document, base, &filter)
}

/// Script bundles the page loads, resolved against `base`
pub fn bundle_urls(html: &str, base: &Url) -> Vec<String> {
    script_sources(&Html::parse_document(html), base)
}

/// Event from a single detail page: JSON-LD when present, otherwise title plus text heuristics
pub fn extract_event_from_page(html: &str, url: &str) -> Option<EventRecord> {
    let doc = Html::parse_document(html);

    let mut name = select_text(&doc, "title");
    if let Some(h1) = select_text(&doc, "h1") {
        if h1.chars().count() > name.as_ref().map_or(0, |n| n.chars().count()) {
            name = Some(h1);
        }
    }

    if let Some(ld) = json_ld_event(&doc) {
        return Some(record_from_json_ld(&ld, name, url));
    }

    let name = name?;
    let page_text = doc.root_element().text().collect::<Vec<_>>().join("\n");

    let mut record = EventRecord::new(Site::WeBook);
    record.name = name;
    record.url = url.to_string();
    record.location = or_sentinel(
        CITY_IN_COUNTRY
            .find(&page_text)
            .or_else(|| CITY_ONLY.find(&page_text))
            .map(|m| m.as_str().to_string()),
    );
    record.price = or_sentinel(
        PRICE
            .captures(&page_text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
    );
    Some(record)
}

fn record_from_json_ld(ld: &Map<String, Value>, page_name: Option<String>, url: &str) -> EventRecord {
    let text = |v: Option<&Value>| -> Option<String> {
        match v? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    let location = match ld.get("location") {
        Some(Value::Object(loc)) => text(loc.get("name")),
        other => text(other),
    };
    let offers = match ld.get("offers") {
        Some(Value::Array(items)) => items.first(),
        other => other,
    };

    let mut record = EventRecord::new(Site::WeBook);
    record.name = or_sentinel(text(ld.get("name")).or(page_name));
    record.start_date = or_sentinel(text(ld.get("startDate")));
    record.end_date = or_sentinel(text(ld.get("endDate")));
    record.location = or_sentinel(location);
    record.price = or_sentinel(offers.and_then(|o| text(o.get("price"))));
    record.description = or_sentinel(text(ld.get("description")));
    record.url = url.to_string();
    record
}

/// Detector output for every JSON blob and inline script object embedded in a page
pub fn events_from_embedded(html: &str, detector: &EventDetector) -> Vec<EventRecord> {
    let doc = Html::parse_document(html);
    let mut events: Vec<EventRecord> = embedded_json(html, &doc)
        .iter()
        .flat_map(|value| detector.detect(value))
        .collect();
    events.extend(
        inline_script_objects(&doc)
            .iter()
            .filter_map(|object| detector.extract(object)),
    );
    events
}

/// Keep the first record for each (lowercased name, url) pair
pub fn dedupe(events: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert((e.name.to_lowercase(), e.url.clone())))
        .collect()
}
