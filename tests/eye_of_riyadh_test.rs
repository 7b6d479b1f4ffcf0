#[cfg(test)]
mod tests {
    use ksa_events_scraper::apis::eye_of_riyadh::{parse_listing, EyeOfRiyadhCrawler};
    use ksa_events_scraper::common::types::EventSource;
    use ksa_events_scraper::common::{Site, NOT_AVAILABLE};
    use ksa_events_scraper::config::{Config, EyeOfRiyadhConfig};
    use ksa_events_scraper::infra::ScrapeContext;
    use ksa_events_scraper::output::read_csv;
    use ksa_events_scraper::pipeline::{Pipeline, RunOutcome};
    use reqwest::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = include_str!("fixtures/eyeofriyadh_listing.html");

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
    }

    fn crawler_for(server: &MockServer, follow_details: bool) -> EyeOfRiyadhCrawler {
        EyeOfRiyadhCrawler::new(EyeOfRiyadhConfig {
            base_url: server.uri(),
            follow_details,
            delay_ms: 0,
            ..EyeOfRiyadhConfig::default()
        })
    }

    #[test]
    fn test_listing_fixture_yields_one_record_per_block() {
        let base = Url::parse("https://www.eyeofriyadh.com/events/").unwrap();
        let events = parse_listing(LISTING, &base);

        assert_eq!(events.len(), 2);

        let food = &events[0];
        assert_eq!(food.site, Site::EyeOfRiyadh);
        assert_eq!(food.name, "Saudi Food Show 2025");
        assert_eq!(food.start_date, "12 - 14 May 2025");
        assert_eq!(food.venue, "RiyadhFront Exhibition & Conference Center");
        assert_eq!(food.description, "The leading food and beverage exhibition in the Kingdom.");
        assert_eq!(food.url, "https://www.eyeofriyadh.com/events/details.php?id=4821");
        assert_eq!(food.detailed_description, NOT_AVAILABLE);

        let ports = &events[1];
        assert_eq!(ports.name, "Smart Ports Summit");
        assert_eq!(ports.url, "https://www.eyeofriyadh.com/events/details.php?id=4900");
        assert_eq!(ports.venue, NOT_AVAILABLE);
        assert_eq!(ports.description, NOT_AVAILABLE);
    }

    #[test]
    fn test_unstyled_page_yields_nothing() {
        let base = Url::parse("https://www.eyeofriyadh.com/events/").unwrap();
        assert!(parse_listing("<html><body><div>No events</div></body></html>", &base).is_empty());
    }

    #[tokio::test]
    async fn test_search_and_detail_pages_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events/index.php"))
            .and(query_param("s", "KSA"))
            .and(query_param("search_post_type", "place"))
            .respond_with(html(LISTING))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/events/details.php"))
            .and(query_param("id", "4821"))
            .respond_with(html(
                r#"<div style="background:#fafafa">Three days of food, beverage and hospitality suppliers.</div>"#,
            ))
            .mount(&server)
            .await;

        let dumps = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dump_dir = Some(dumps.path().to_path_buf());
        let ctx = ScrapeContext::new(&config).unwrap();

        let crawler = crawler_for(&server, true);
        let mut events = crawler.get_event_list(&ctx).await.unwrap();

        assert_eq!(events.len(), 2);
        let food = events.remove(0);
        assert_eq!(food.url, format!("{}/events/details.php?id=4821", server.uri()));
        assert_eq!(
            food.detailed_description,
            "Three days of food, beverage and hospitality suppliers."
        );
        // Detail page for the second event answers 404
        assert_eq!(events[0].detailed_description, NOT_AVAILABLE);
        assert_eq!(ctx.fetcher.stats().failed, 1);

        let dumped = std::fs::read_dir(dumps.path()).unwrap().count();
        assert!(dumped >= 2);
    }

    #[tokio::test]
    async fn test_pipeline_writes_csv_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events/index.php"))
            .respond_with(html(LISTING))
            .mount(&server)
            .await;

        let out = tempfile::tempdir().unwrap();
        let ctx = ScrapeContext::new(&Config::default()).unwrap();
        let crawler = crawler_for(&server, false);

        let result = Pipeline::run_for_source(&crawler, &ctx, out.path()).await.unwrap();

        assert_eq!(result.outcome(), RunOutcome::Extracted);
        assert_eq!(result.saved_events, 2);
        assert_eq!(result.pages_fetched, 1);
        assert_eq!(result.fetch_failures, 0);
        assert_eq!(result.output_files.len(), 2);

        let rows = read_csv(&out.path().join("eyeofriyadh_ksa_events_latest.csv")).unwrap();
        assert_eq!(
            rows[0],
            vec!["Name", "Date", "Venue", "Description", "URL", "Detailed Description"]
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], "Saudi Food Show 2025");
    }

    #[tokio::test]
    async fn test_unreachable_site_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let out = tempfile::tempdir().unwrap();
        let ctx = ScrapeContext::new(&Config::default()).unwrap();
        let crawler = crawler_for(&server, false);

        let result = Pipeline::run_for_source(&crawler, &ctx, out.path()).await.unwrap();

        assert_eq!(result.total_events, 0);
        assert!(result.output_files.is_empty());
        assert_eq!(result.outcome(), RunOutcome::AllFetchesFailed);
    }

    #[tokio::test]
    async fn test_page_without_blocks_is_nothing_matched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("<html><body><p>Maintenance</p></body></html>"))
            .mount(&server)
            .await;

        let out = tempfile::tempdir().unwrap();
        let ctx = ScrapeContext::new(&Config::default()).unwrap();
        let crawler = crawler_for(&server, false);

        let result = Pipeline::run_for_source(&crawler, &ctx, out.path()).await.unwrap();
        assert_eq!(result.outcome(), RunOutcome::NothingMatched);
        assert_eq!(result.pages_fetched, 1);
    }
}
