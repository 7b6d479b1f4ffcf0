pub mod browser;
pub mod debug_dump;
pub mod http_client;

pub use browser::BrowserSession;
#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use debug_dump::DebugDumps;
pub use http_client::{FetchStats, FetchedPage, HttpFetcher};

use crate::common::error::Result;
use crate::config::Config;
use std::time::Duration;

/// Everything a site scraper needs for one run, owned by the caller and borrowed by each source
pub struct ScrapeContext {
    pub fetcher: HttpFetcher,
    pub dumps: DebugDumps,
    pub browser: BrowserSession,
}

impl ScrapeContext {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(&config.http)?,
            dumps: DebugDumps::new(config.output.dump_dir.clone()),
            browser: BrowserSession::new(config.browser.clone()),
        })
    }

    /// Release anything the run started. Call once, after the last source.
    pub async fn shutdown(&self) {
        self.browser.shutdown().await;
    }
}

/// Fixed pacing between requests
pub async fn pause(delay_ms: u64) {
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
