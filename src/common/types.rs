use crate::common::constants::*;
use crate::common::error::{Result, ScraperError};
use crate::infra::ScrapeContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The listing sites this crate knows how to scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    EyeOfRiyadh,
    Meetup,
    WeBook,
}

impl Site {
    pub const ALL: [Site; 3] = [Site::EyeOfRiyadh, Site::Meetup, Site::WeBook];

    /// Name used on the command line
    pub fn api_name(&self) -> &'static str {
        match self {
            Site::EyeOfRiyadh => EYE_OF_RIYADH_API,
            Site::Meetup => MEETUP_API,
            Site::WeBook => WEBOOK_API,
        }
    }

    /// Literal written to the `Site` column
    pub fn domain(&self) -> &'static str {
        match self {
            Site::EyeOfRiyadh => EYE_OF_RIYADH_DOMAIN,
            Site::Meetup => MEETUP_DOMAIN,
            Site::WeBook => WEBOOK_DOMAIN,
        }
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            Site::EyeOfRiyadh => "eyeofriyadh_ksa_events",
            Site::Meetup => "meetup_saudi_events",
            Site::WeBook => "webook_events",
        }
    }

    /// Fixed CSV header for this site, in output order
    pub fn columns(&self) -> &'static [Column] {
        match self {
            Site::EyeOfRiyadh => EYE_OF_RIYADH_COLUMNS,
            Site::Meetup => MEETUP_COLUMNS,
            Site::WeBook => WEBOOK_COLUMNS,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for Site {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Site::ALL
            .into_iter()
            .find(|site| site.api_name() == wanted || site.domain() == wanted)
            .ok_or_else(|| {
                ScraperError::Config(format!(
                    "Unknown site '{}'. Available: {}",
                    s,
                    get_supported_apis().join(", ")
                ))
            })
    }
}

/// Addressable fields of an [`EventRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Site,
    Name,
    FullName,
    StartDate,
    DateTime,
    EndDate,
    Venue,
    Location,
    City,
    Description,
    DetailedDescription,
    Price,
    Url,
}

/// One output column: the header text and the record field it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub field: Field,
}

const fn col(header: &'static str, field: Field) -> Column {
    Column { header, field }
}

const EYE_OF_RIYADH_COLUMNS: &[Column] = &[
    col("Name", Field::Name),
    col("Date", Field::StartDate),
    col("Venue", Field::Venue),
    col("Description", Field::Description),
    col("URL", Field::Url),
    col("Detailed Description", Field::DetailedDescription),
];

const MEETUP_COLUMNS: &[Column] = &[
    col("Site", Field::Site),
    col("Name", Field::Name),
    col("Date", Field::StartDate),
    col("Venue (Brief)", Field::Venue),
    col("Short Description", Field::Description),
    col("URL", Field::Url),
    col("Full Name", Field::FullName),
    col("Date & Time", Field::DateTime),
    col("City", Field::City),
    col("Detailed Description", Field::DetailedDescription),
];

const WEBOOK_COLUMNS: &[Column] = &[
    col("Site", Field::Site),
    col("Name", Field::Name),
    col("Start Date", Field::StartDate),
    col("End Date", Field::EndDate),
    col("Location", Field::Location),
    col("Price", Field::Price),
    col("Description", Field::Description),
    col("URL", Field::Url),
];

/// A scraped event. Every field holds [`NOT_AVAILABLE`] until an extraction step fills it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub site: Site,
    pub name: String,
    pub full_name: String,
    pub start_date: String,
    pub date_time: String,
    pub end_date: String,
    pub venue: String,
    pub location: String,
    pub city: String,
    pub description: String,
    pub detailed_description: String,
    pub price: String,
    pub url: String,
}

impl EventRecord {
    pub fn new(site: Site) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            site,
            name: na(),
            full_name: na(),
            start_date: na(),
            date_time: na(),
            end_date: na(),
            venue: na(),
            location: na(),
            city: na(),
            description: na(),
            detailed_description: na(),
            price: na(),
            url: na(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Site => self.site.domain(),
            Field::Name => &self.name,
            Field::FullName => &self.full_name,
            Field::StartDate => &self.start_date,
            Field::DateTime => &self.date_time,
            Field::EndDate => &self.end_date,
            Field::Venue => &self.venue,
            Field::Location => &self.location,
            Field::City => &self.city,
            Field::Description => &self.description,
            Field::DetailedDescription => &self.detailed_description,
            Field::Price => &self.price,
            Field::Url => &self.url,
        }
    }

    pub fn has_name(&self) -> bool {
        is_available(&self.name)
    }

    /// Values in the order of `site.columns()`
    pub fn row(&self) -> Vec<&str> {
        self.site.columns().iter().map(|c| self.get(c.field)).collect()
    }

    /// Best place label for summaries: city, then location, then venue
    pub fn place(&self) -> &str {
        [&self.city, &self.location, &self.venue]
            .into_iter()
            .find(|v| is_available(v))
            .map(String::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }
}

pub fn is_available(value: &str) -> bool {
    !value.is_empty() && value != NOT_AVAILABLE
}

/// Core trait that all event sites must implement
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    fn site(&self) -> Site;

    /// Fetch and extract all events from this site.
    ///
    /// Network and parse failures are logged and skipped; an unreachable site yields an empty list.
    async fn get_event_list(&self, ctx: &ScrapeContext) -> Result<Vec<EventRecord>>;

    /// Determine if an event should be left out of the output
    fn should_skip(&self, _record: &EventRecord) -> (bool, String) {
        (false, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_all_sentinels() {
        let record = EventRecord::new(Site::WeBook);
        assert!(record.row()[1..].iter().all(|v| *v == NOT_AVAILABLE));
        assert_eq!(record.get(Field::Site), "webook.com");
        assert!(!record.has_name());
    }

    #[test]
    fn site_parses_from_api_name_and_domain() {
        assert_eq!("meetup".parse::<Site>().unwrap(), Site::Meetup);
        assert_eq!("WeBook.com".parse::<Site>().unwrap(), Site::WeBook);
        assert_eq!(" eye_of_riyadh ".parse::<Site>().unwrap(), Site::EyeOfRiyadh);
        assert!("ticketmaster".parse::<Site>().is_err());
    }

    #[test]
    fn columns_match_row_width() {
        for site in Site::ALL {
            assert_eq!(EventRecord::new(site).row().len(), site.columns().len());
        }
    }

    #[test]
    fn place_prefers_city() {
        let mut record = EventRecord::new(Site::Meetup);
        record.venue = "Some Hall, Riyadh".into();
        assert_eq!(record.place(), "Some Hall, Riyadh");
        record.city = "Riyadh".into();
        assert_eq!(record.place(), "Riyadh");
    }
}
