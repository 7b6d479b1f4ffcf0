use crate::common::constants::*;
use crate::common::error::{Result, ScraperError};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub eye_of_riyadh: EyeOfRiyadhConfig,
    pub meetup: MeetupConfig,
    pub webook: WeBookConfig,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Raw responses are written here for manual inspection when set
    pub dump_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            dump_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EyeOfRiyadhConfig {
    pub base_url: String,
    pub query: String,
    pub follow_details: bool,
    pub delay_ms: u64,
}

impl Default for EyeOfRiyadhConfig {
    fn default() -> Self {
        Self {
            base_url: EYE_OF_RIYADH_BASE_URL.to_string(),
            query: "KSA".to_string(),
            follow_details: false,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeetupConfig {
    pub base_url: String,
    pub country: String,
    pub cities: Vec<String>,
    pub search_delay_ms: u64,
    pub detail_delay_ms: u64,
}

impl Default for MeetupConfig {
    fn default() -> Self {
        Self {
            base_url: MEETUP_BASE_URL.to_string(),
            country: "Saudi Arabia".to_string(),
            cities: ["Makkah", "Riyadh", "Jeddah", "Dammam", "al-Khubar", "Medina", "Khobar"]
                .into_iter()
                .map(String::from)
                .collect(),
            search_delay_ms: 2000,
            detail_delay_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeBookConfig {
    pub base_url: String,
    pub query: String,
    /// Paths queried for JSON, relative to `base_url`
    pub api_endpoints: Vec<String>,
    /// Detail pages known to carry event data, relative to `base_url`
    pub known_paths: Vec<String>,
    /// Script bundles from the search page scanned for more API endpoints
    pub script_bundle_limit: usize,
    pub delay_ms: u64,
}

impl Default for WeBookConfig {
    fn default() -> Self {
        Self {
            base_url: WEBOOK_BASE_URL.to_string(),
            query: "KSA".to_string(),
            api_endpoints: [
                "/api/search",
                "/api/events",
                "/api/experiences",
                "/api/getEvents",
                "/api/getExperiences",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            known_paths: [
                "/en/experiences/introductory-session",
                "/en/experiences/introductory-session-1",
                "/en/experiences/introductory-session-fast-fit-al-narjis-branch-ladies-gents",
                "/en/experiences/introductory-session-fast-fit-al-khalidiyyah-branch-ladies-gents",
                "/en/experiences/introductory-session-fast-fit-al-rakah-branch-ladies-gents",
                "/en/experiences/introductory-session-fast-fit-al-waha-branch-gents-only",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            script_bundle_limit: 10,
            delay_ms: 2000,
        }
    }
}

/// Headless Chrome fallback. Only used when built with the `browser` feature.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// Time given to client-side rendering after navigation
    pub render_wait_ms: u64,
    /// Tried in order; the first one found is clicked
    pub cookie_selectors: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            headless: true,
            chrome_path: None,
            render_wait_ms: 5000,
            cookie_selectors: [
                "#onetrust-accept-btn-handler",
                "button[id*='accept']",
                "button[class*='cookie']",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Config {
    /// Falls back to defaults when the file does not exist
    pub fn load_from(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let mut config = if config_path.exists() {
            let config_content = fs::read_to_string(config_path).map_err(|e| {
                ScraperError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            info!("Loaded configuration from {}", config_path.display());
            Self::from_toml(&config_content)?
        } else {
            debug!("No config file at {}, using defaults", config_path.display());
            Config::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = env::var("KSA_SCRAPER_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("KSA_SCRAPER_DUMP_DIR") {
            self.output.dump_dir = Some(PathBuf::from(dir));
        }
        if let Ok(secs) = env::var("KSA_SCRAPER_TIMEOUT_SECS") {
            self.http.timeout_seconds = secs.trim().parse().map_err(|_| {
                ScraperError::Config(format!(
                    "KSA_SCRAPER_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [http]
            timeout_seconds = 20

            [meetup]
            cities = ["Riyadh"]
            "#,
        )
        .unwrap();

        assert_eq!(config.http.timeout_seconds, 20);
        assert_eq!(config.http.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.meetup.cities, vec!["Riyadh".to_string()]);
        assert_eq!(config.meetup.detail_delay_ms, 3000);
        assert_eq!(config.webook.api_endpoints.len(), 5);
        assert_eq!(config.output.dir, PathBuf::from("output"));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.eye_of_riyadh.query, "KSA");
    }

    #[test]
    fn explicit_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraper.toml");
        fs::write(&path, "[webook]\nquery = \"Padel\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.webook.query, "Padel");
        assert_eq!(config.eye_of_riyadh.query, "KSA");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml("[http]\ntimeout_seconds = \"soon\""),
            Err(ScraperError::Toml(_))
        ));
    }

    #[test]
    fn sample_config_matches_defaults() {
        let sample = Config::from_toml(include_str!("../config.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(sample.webook.known_paths, defaults.webook.known_paths);
        assert_eq!(sample.meetup.cities, defaults.meetup.cities);
        assert_eq!(sample.output.dump_dir, None);
        assert_eq!(sample.webook.script_bundle_limit, defaults.webook.script_bundle_limit);
        assert_eq!(sample.browser.enabled, defaults.browser.enabled);
    }

    #[test]
    fn browser_section_is_opt_in() {
        assert!(!Config::default().browser.enabled);

        let config = Config::from_toml(
            r#"
            [browser]
            enabled = true
            chrome_path = "/usr/bin/chromium"
            "#,
        )
        .unwrap();
        assert!(config.browser.enabled);
        assert!(config.browser.headless);
        assert_eq!(config.browser.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.browser.cookie_selectors.len(), 3);
    }
}
