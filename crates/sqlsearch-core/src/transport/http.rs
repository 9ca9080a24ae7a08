//! Elasticsearch REST transport.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Document, MultiSearchItem, SearchHits, SearchTransport};
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::query::SearchRequest;

/// `total` is an object in 7.x and later, a bare number before.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct HitsContainer {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsContainer,
}

#[derive(Debug, Deserialize)]
struct MultiSearchResponse {
    responses: Vec<MultiSearchEntry>,
}

#[derive(Debug, Deserialize)]
struct MultiSearchEntry {
    #[serde(default)]
    hits: Option<HitsContainer>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl From<HitsContainer> for SearchHits {
    fn from(container: HitsContainer) -> Self {
        let total = match container.total {
            Some(TotalHits::Object { value } | TotalHits::Count(value)) => value,
            None => container.hits.len() as u64,
        };
        Self {
            total,
            hits: container.hits,
        }
    }
}

/// [`SearchTransport`] over HTTP.
pub struct HttpTransport {
    config: TransportConfig,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the HTTP client cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn search_url(&self, index: &str) -> String {
        format!("{}/{}/_search", self.base_url(), index.trim_start_matches('/'))
    }

    fn msearch_url(&self) -> String {
        format!("{}/_msearch", self.base_url())
    }

    /// Makes an authenticated POST request.
    fn build_request(&self, url: &str, content_type: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(url).header("Content-Type", content_type);

        if let Some(api_key) = &self.config.api_key {
            req = req.header("Authorization", format!("ApiKey {api_key}"));
        } else if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            req = req.basic_auth(user, Some(pass));
        }

        req
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = req
            .send()
            .await
            .map_err(|e| Error::Transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Transport(format!("backend error {status}: {body}")));
        }
        Ok(response)
    }
}

/// Renders the `_msearch` NDJSON body: a header line and a body line per
/// request, each terminated by a newline.
pub(crate) fn msearch_body(requests: &[SearchRequest]) -> Result<String> {
    let mut body = String::new();
    for request in requests {
        body.push_str(&serde_json::to_string(&serde_json::json!({ "index": request.index }))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&request.body())?);
        body.push('\n');
    }
    Ok(body)
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn search(&self, request: &SearchRequest) -> Result<SearchHits> {
        let url = self.search_url(&request.index);
        debug!(index = %request.index, "search");

        let response = self
            .send(self.build_request(&url, "application/json").json(&request.body()))
            .await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("failed to parse search response: {e}")))?;

        Ok(parsed.hits.into())
    }

    async fn multi_search(&self, requests: &[SearchRequest]) -> Result<Vec<MultiSearchItem>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.msearch_url();
        debug!(requests = requests.len(), "multi search");

        let response = self
            .send(
                self.build_request(&url, "application/x-ndjson")
                    .body(msearch_body(requests)?),
            )
            .await?;
        let parsed: MultiSearchResponse = response.json().await.map_err(|e| {
            Error::Transport(format!("failed to parse multi search response: {e}"))
        })?;

        if parsed.responses.len() != requests.len() {
            return Err(Error::Transport(format!(
                "multi search returned {} responses for {} requests",
                parsed.responses.len(),
                requests.len()
            )));
        }

        Ok(parsed
            .responses
            .into_iter()
            .map(|entry| match (entry.error, entry.hits) {
                (Some(error), _) => MultiSearchItem::Failed(error.to_string()),
                (None, Some(hits)) => MultiSearchItem::Hits(hits.into()),
                (None, None) => MultiSearchItem::Failed("response has no hits".to_string()),
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
