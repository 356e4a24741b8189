//! Outbound page fetching.
//!
//! `PageSource` is the seam the scrapers depend on. `PageFetcher` is the real
//! implementation: one GET per call, routed through the shared `RateLimiter`,
//! with the headers the catalog site expects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog::{CatalogError, Result};
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::rate_limiter::RateLimiter;

/// Identifies the agent to the catalog site
pub const USER_AGENT: &str = "CineAgentBot/1.0 (educational project)";

/// French first, English as a fallback
pub const ACCEPT_LANGUAGE_VALUE: &str = "fr-FR,fr;q=0.9,en;q=0.8";

/// Default timeout for a single page fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can turn a URL into an HTML body.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP page fetcher gated by a process-wide rate limiter
pub struct PageFetcher {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
}

impl PageFetcher {
    /// Build a fetcher sharing `limiter` with every other fetcher in the process.
    pub fn new(limiter: Arc<RateLimiter>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| CatalogError::ClientSetup(e.to_string()))?;

        Ok(Self { client, limiter })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", url, e);
                CatalogError::network(url, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP {} for {}", status, url);
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::network(url, e))
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.limiter.run(|| self.get_text(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_fetcher() -> PageFetcher {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        PageFetcher::new(limiter, Duration::from_secs(5)).expect("client builds")
    }

    #[tokio::test]
    async fn test_fetch_sends_identifying_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/discover/movie")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .match_header("user-agent", Matcher::Regex("CineAgentBot".into()))
            .match_header("accept-language", ACCEPT_LANGUAGE_VALUE)
            .with_status(200)
            .with_body("<html><body>ok</body></html>")
            .create_async()
            .await;

        let fetcher = test_fetcher();
        let body = fetcher
            .fetch(&format!("{}/discover/movie?page=1", server.url()))
            .await
            .unwrap();

        assert!(body.contains("ok"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/movie/404")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = test_fetcher();
        let err = fetcher
            .fetch(&format!("{}/movie/404", server.url()))
            .await
            .unwrap_err();

        match err {
            CatalogError::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_reports_network_failure() {
        let fetcher = test_fetcher();
        // Port 9 (discard) is not listening on loopback in test environments
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();

        assert!(matches!(err, CatalogError::Network { .. }));
    }
}
