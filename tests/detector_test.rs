#[cfg(test)]
mod tests {
    use ksa_events_scraper::common::{Site, NOT_AVAILABLE};
    use ksa_events_scraper::extract::EventDetector;
    use serde_json::json;

    fn detector() -> EventDetector {
        EventDetector::webook("https://webook.com")
    }

    #[test]
    fn test_tree_without_titles_yields_nothing() {
        let tree = json!({
            "data": [
                {"date": "2025-01-01", "location": "Riyadh", "price": 10},
                {"slug": "x", "venue": {"city": "Jeddah"}},
                [1, 2, "three", null, true]
            ],
            "meta": {"count": 2}
        });
        assert!(detector().detect(&tree).is_empty());
        assert!(detector().detect(&json!("Community Summit")).is_empty());
        assert!(detector().detect(&json!(null)).is_empty());
    }

    #[test]
    fn test_flat_event_with_two_fields() {
        let tree = json!({"title": "Community Summit", "date": "2025-01-01", "location": "Riyadh"});
        let events = detector().detect(&tree);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.site, Site::WeBook);
        assert_eq!(event.name, "Community Summit");
        assert_eq!(event.start_date, "2025-01-01");
        assert_eq!(event.location, "Riyadh");
        assert_eq!(event.price, NOT_AVAILABLE);
        assert_eq!(event.url, NOT_AVAILABLE);
        assert_eq!(event.end_date, NOT_AVAILABLE);
    }

    #[test]
    fn test_deeply_nested_event_gets_slug_url() {
        let tree = json!({"a": {"b": {"title": "X", "slug": "x-event", "startDate": "2025-02-02"}}});
        let events = detector().detect(&tree);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "X");
        assert_eq!(events[0].start_date, "2025-02-02");
        assert_eq!(events[0].url, "https://webook.com/en/experiences/x-event");
    }

    #[test]
    fn test_title_term_match_with_nested_city() {
        let tree = json!({"name": "Fast Fit Session", "location": {"city": "Jeddah"}});
        let events = detector().detect(&tree);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Fast Fit Session");
        assert_eq!(events[0].location, "Jeddah");
    }

    #[test]
    fn test_events_inside_arrays_keep_document_order() {
        let tree = json!({
            "pageProps": {
                "experiences": [
                    {"title": "Desert Experience", "slug": "desert"},
                    {"title": "Padel Court", "slug": "padel"},
                    {"name": "Jeddah Summit", "startDate": "2025-03-01", "endDate": "2025-03-02", "price": {"amount": 200}}
                ]
            }
        });
        let names: Vec<String> = detector().detect(&tree).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Desert Experience", "Jeddah Summit"]);
    }

    #[test]
    fn test_matched_parent_and_nested_child_are_both_kept() {
        let tree = json!({
            "title": "Riyadh Season",
            "date": "2025-10-10",
            "venue": "Boulevard",
            "sessions": [{"title": "Opening Session"}]
        });
        let names: Vec<String> = detector().detect(&tree).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Riyadh Season", "Opening Session"]);
    }

    #[test]
    fn test_long_description_is_truncated() {
        let tree = json!({"title": "Conference", "description": "a".repeat(800)});
        let events = detector().detect(&tree);
        assert_eq!(events[0].description.chars().count(), 500);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let tree = json!({
            "props": {"pageProps": {"items": [
                {"title": "Community Summit", "date": "2025-01-01", "location": "Riyadh"},
                {"name": "Fast Fit Session", "location": {"city": "Jeddah"}}
            ]}}
        });
        let before = tree.clone();
        let first = detector().detect(&tree);
        let second = detector().detect(&tree);

        assert_eq!(first, second);
        assert_eq!(tree, before);
        assert_eq!(first.len(), 2);
    }
}
