use crate::config::BrowserConfig;
use tracing::{debug, warn};

#[cfg(feature = "browser")]
use crate::common::error::{Result, ScraperError};
#[cfg(feature = "browser")]
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::info;

/// A running headless Chrome plus the task that drives its CDP connection
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = ChromeConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let chrome = builder.build().map_err(ScraperError::Browser)?;

        let (browser, mut handler) = Browser::launch(chrome)
            .await
            .map_err(|e| ScraperError::Browser(format!("launch failed: {e}")))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!("🌐 Headless browser started");
        Ok(Self { browser, handler })
    }

    /// Navigate, accept cookies if a banner shows, wait for rendering and return the DOM as HTML
    pub async fn render(&self, url: &str, config: &BrowserConfig) -> Result<String> {
        let cdp = |e: chromiumoxide::error::CdpError| ScraperError::Browser(format!("{url}: {e}"));

        let page = self.browser.new_page(url).await.map_err(cdp)?;
        page.wait_for_navigation().await.map_err(cdp)?;

        for selector in &config.cookie_selectors {
            if let Ok(button) = page.find_element(selector.as_str()).await {
                if button.click().await.is_ok() {
                    debug!("Clicked cookie banner via {}", selector);
                    break;
                }
            }
        }

        super::pause(config.render_wait_ms).await;
        let html = page.content().await.map_err(cdp)?;
        if let Err(e) = page.close().await {
            debug!("Closing tab for {} failed: {}", url, e);
        }
        Ok(html)
    }

    pub async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for the browser process failed: {}", e);
        }
        self.handler.abort();
        info!("🌐 Headless browser stopped");
    }
}

#[cfg(feature = "browser")]
impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        // chromiumoxide kills the child process when `Browser` drops
        self.handler.abort();
    }
}

/// Browser rendering for one run. Chrome is launched on first use and torn down by `shutdown`.
pub struct BrowserSession {
    config: BrowserConfig,
    #[cfg(feature = "browser")]
    fetcher: Mutex<Option<BrowserFetcher>>,
}

impl BrowserSession {
    pub fn new(config: BrowserConfig) -> Self {
        if config.enabled && !cfg!(feature = "browser") {
            warn!("[browser] is enabled but this build lacks the `browser` feature; rendering is off");
        }
        Self {
            config,
            #[cfg(feature = "browser")]
            fetcher: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && cfg!(feature = "browser")
    }

    /// Rendered HTML for `url`, or `None` when rendering is off or fails
    #[cfg(feature = "browser")]
    pub async fn render(&self, url: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let mut slot = self.fetcher.lock().await;
        if slot.is_none() {
            match BrowserFetcher::launch(&self.config).await {
                Ok(fetcher) => *slot = Some(fetcher),
                Err(e) => {
                    warn!("Browser unavailable: {}", e);
                    return None;
                }
            }
        }
        let fetcher = slot.as_ref()?;
        match fetcher.render(url, &self.config).await {
            Ok(html) => Some(html),
            Err(e) => {
                debug!("Browser fetch failed: {}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "browser"))]
    pub async fn render(&self, url: &str) -> Option<String> {
        debug!("Not rendering {}: built without browser support", url);
        None
    }

    #[cfg(feature = "browser")]
    pub async fn shutdown(&self) {
        let fetcher = self.fetcher.lock().await.take();
        if let Some(mut fetcher) = fetcher {
            fetcher.close().await;
        }
    }

    #[cfg(not(feature = "browser"))]
    pub async fn shutdown(&self) {}
}
