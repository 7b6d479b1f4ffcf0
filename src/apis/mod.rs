pub mod eye_of_riyadh;
pub mod meetup;
pub mod webook;

use crate::common::types::{EventSource, Site};
use crate::config::Config;
use eye_of_riyadh::EyeOfRiyadhCrawler;
use meetup::MeetupCrawler;
use webook::WeBookCrawler;

/// Build the scraper for a site from its config section
pub fn create_source(site: Site, config: &Config) -> Box<dyn EventSource> {
    match site {
        Site::EyeOfRiyadh => Box::new(EyeOfRiyadhCrawler::new(config.eye_of_riyadh.clone())),
        Site::Meetup => Box::new(MeetupCrawler::new(config.meetup.clone())),
        Site::WeBook => Box::new(WeBookCrawler::new(config.webook.clone())),
    }
}
