use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

use common::{Article, NewsLookup, ScreenerError};

const SERVICE: &str = "newsapi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://newsapi.org/v2/everything".to_string(),
            timeout_secs: 10,
        }
    }
}

impl NewsConfig {
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ScreenerError::config(format!(
                "news.base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ScreenerError::config("news.timeout_secs must be positive"));
        }
        Ok(())
    }
}

/// Trips on the first rate-limit response; once tripped, callers skip I/O
/// and the gate counts how many calls were suppressed.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    tripped: AtomicBool,
    suppressed: AtomicU64,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Returns true only for the call that tripped the gate
    pub fn trip(&self) -> bool {
        !self.tripped.swap(true, Ordering::SeqCst)
    }

    /// Returns true when the call may proceed
    pub fn admit(&self) -> bool {
        if self.is_tripped() {
            self.suppressed.fetch_add(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    pub fn suppressed_calls(&self) -> u64 {
        self.suppressed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

/// NewsAPI `everything` search
pub struct NewsApiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    gate: RateLimitGate,
}

impl NewsApiClient {
    pub fn new(config: &NewsConfig) -> Result<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("⚠️  News API key not configured, sentiment will stay neutral");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build NewsAPI HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            gate: RateLimitGate::new(),
        })
    }

    pub fn gate(&self) -> &RateLimitGate {
        &self.gate
    }
}

impl NewsApiClient {
    /// One search request. Every failure, including a rate limit, comes back
    /// as `ExternalUnavailable`.
    pub async fn search(
        &self,
        api_key: &str,
        query: &str,
        language: &str,
        page_size: usize,
    ) -> Result<Vec<Article>, ScreenerError> {
        let page_size = page_size.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("language", language),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .map_err(|e| ScreenerError::unavailable(SERVICE, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            if self.gate.trip() {
                error!("NewsAPI rate limit reached (429), no further news requests will be made");
            }
            return Err(ScreenerError::unavailable(SERVICE, "rate limited (429)"));
        }
        if !status.is_success() {
            return Err(ScreenerError::unavailable(SERVICE, format!("HTTP {}", status)));
        }

        let body: EverythingResponse = response
            .json()
            .await
            .map_err(|e| ScreenerError::unavailable(SERVICE, format!("unexpected payload: {}", e)))?;
        debug!("[NewsAPI] {} articles for '{}'", body.articles.len(), query);
        Ok(body.articles)
    }
}

#[async_trait]
impl NewsLookup for NewsApiClient {
    async fn fetch_articles(&self, query: &str, language: &str, page_size: usize) -> Vec<Article> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };
        if !self.gate.admit() {
            return Vec::new();
        }

        match self.search(api_key, query, language, page_size).await {
            Ok(articles) => articles,
            Err(e) => {
                if !self.gate.is_tripped() {
                    warn!("News lookup for '{}' degraded to empty: {}", query, e);
                }
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: Option<&str>) -> NewsApiClient {
        NewsApiClient::new(&NewsConfig {
            api_key: api_key.map(String::from),
            base_url: format!("{}/v2/everything", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_articles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "BTC"))
            .and(query_param("language", "pt"))
            .and(query_param("pageSize", "5"))
            .and(query_param("apiKey", "news-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 2,
                "articles": [
                    { "title": "Bitcoin em queda", "description": null, "url": "https://x" },
                    { "title": "Mercado estável", "description": "Sem novidades" }
                ]
            })))
            .mount(&server)
            .await;

        let articles = client(&server, Some("news-key"))
            .fetch_articles("BTC", "pt", 5)
            .await;
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title.as_deref(), Some("Bitcoin em queda"));
        assert_eq!(articles[0].description, None);
        assert_eq!(articles[1].description.as_deref(), Some("Sem novidades"));
    }

    #[tokio::test]
    async fn test_rate_limit_trips_gate_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let news = client(&server, Some("news-key"));
        assert!(news.fetch_articles("BTC", "pt", 5).await.is_empty());
        assert!(news.gate().is_tripped());

        // later calls return empty without reaching the server
        assert!(news.fetch_articles("ETH", "pt", 5).await.is_empty());
        assert!(news.fetch_articles("SOL", "pt", 5).await.is_empty());
        assert_eq!(news.gate().suppressed_calls(), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_empty_but_not_tripped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let news = client(&server, Some("news-key"));
        assert!(news.fetch_articles("BTC", "pt", 5).await.is_empty());
        assert!(!news.gate().is_tripped());

        let err = news.search("news-key", "BTC", "pt", 5).await.unwrap_err();
        assert!(matches!(err, ScreenerError::ExternalUnavailable { service: "newsapi", .. }));
        assert!(err.to_string().contains("500"));
        assert!(!err.is_surfaced());
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let news = client(&server, Some("news-key"));
        let err = news.search("news-key", "BTC", "pt", 5).await.unwrap_err();
        assert_eq!(err.to_string(), "newsapi unavailable: rate limited (429)");
        assert!(news.gate().is_tripped());
    }

    #[tokio::test]
    async fn test_missing_key_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let news = client(&server, None);
        assert!(news.fetch_articles("BTC", "pt", 5).await.is_empty());
    }

    #[test]
    fn test_gate_trips_once() {
        let gate = RateLimitGate::new();
        assert!(gate.admit());
        assert!(gate.trip());
        assert!(!gate.trip());
        assert!(!gate.admit());
        assert_eq!(gate.suppressed_calls(), 1);
    }
}
