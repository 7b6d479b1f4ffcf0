/// Site name constants to ensure consistency across the codebase
/// These constants define the mapping between CLI names and the site literal written to output

// User-friendly site names (used in CLI)
pub const EYE_OF_RIYADH_API: &str = "eye_of_riyadh";
pub const MEETUP_API: &str = "meetup";
pub const WEBOOK_API: &str = "webook";

// Site literals (written to the `Site` column)
pub const EYE_OF_RIYADH_DOMAIN: &str = "eyeofriyadh.com";
pub const MEETUP_DOMAIN: &str = "meetup.com";
pub const WEBOOK_DOMAIN: &str = "webook.com";

// Default base URLs, overridable from config.toml
pub const EYE_OF_RIYADH_BASE_URL: &str = "https://www.eyeofriyadh.com";
pub const MEETUP_BASE_URL: &str = "https://www.meetup.com";
pub const WEBOOK_BASE_URL: &str = "https://webook.com";

/// Placeholder written in place of any field the heuristics could not find
pub const NOT_AVAILABLE: &str = "N/A";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Get all supported user-friendly site names
pub fn get_supported_apis() -> Vec<&'static str> {
    vec![EYE_OF_RIYADH_API, MEETUP_API, WEBOOK_API]
}
