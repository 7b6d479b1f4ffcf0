use crate::common::constants::DEFAULT_ACCEPT;
use crate::common::error::{Result, ScraperError};
use crate::config::HttpConfig;
use metrics::counter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Body and metadata of a successful (2xx) response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl FetchedPage {
    pub fn is_json(&self) -> bool {
        self.content_type.to_lowercase().contains("application/json")
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub succeeded: usize,
    pub failed: usize,
}

impl FetchStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Shared HTTP client: browser-like default headers, fixed timeout, and a cookie store
/// that persists across every request made through it.
pub struct HttpFetcher {
    client: Client,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .cookie_store(true)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        })
    }

    pub async fn get(&self, url: &str) -> Result<FetchedPage> {
        self.send(self.client.get(url), url).await
    }

    /// GET with extra headers layered over the defaults
    pub async fn get_with_headers(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchedPage> {
        let request = headers
            .iter()
            .fold(self.client.get(url), |req, (name, value)| req.header(*name, *value));
        self.send(request, url).await
    }

    pub async fn post_json(&self, url: &str, body: &Value) -> Result<FetchedPage> {
        self.send(self.client.post(url).json(body), url).await
    }

    /// GET that logs any failure and hands back `None` instead of an error
    pub async fn fetch_page(&self, url: &str) -> Option<FetchedPage> {
        match self.get(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                None
            }
        }
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<FetchedPage> {
        let result = execute(request, url).await;
        match &result {
            Ok(page) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                counter!("ksa_http_requests_total", "outcome" => "success").increment(1);
                debug!("Fetched {} ({} bytes, {})", url, page.body.len(), page.content_type);
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                counter!("ksa_http_requests_total", "outcome" => "failure").increment(1);
            }
        }
        result
    }
}

async fn execute(request: RequestBuilder, url: &str) -> Result<FetchedPage> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ScraperError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let body = resp.text().await?;

    Ok(FetchedPage {
        url: url.to_string(),
        status: status.as_u16(),
        content_type,
        body,
    })
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ScraperError::Config(format!("Invalid header value '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_type_detection() {
        let page = FetchedPage {
            url: "https://webook.com/api/events".into(),
            status: 200,
            content_type: "Application/JSON; charset=utf-8".into(),
            body: r#"{"ok": true}"#.into(),
        };
        assert!(page.is_json());
        assert_eq!(page.json().unwrap()["ok"], Value::Bool(true));
    }

    #[test]
    fn invalid_user_agent_is_a_config_error() {
        let config = HttpConfig {
            user_agent: "bad\nagent".into(),
            ..HttpConfig::default()
        };
        assert!(matches!(HttpFetcher::new(&config), Err(ScraperError::Config(_))));
    }
}
