//! HTTP implementation of the page-fetch capability.

use crate::error::ClientError;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::time::Duration;
use watchfeed_rs_protocol::{FetchError, MatchQuery, PageFetcher, PageQuery, PageResponse};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Connection settings for the dashboard backend.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Optional API key sent on every request.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Body of the `/api/history/count` endpoint.
#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// `PageFetcher` over the backend's history API.
///
/// No retry layer here: the engine's lazy-load trigger refiring is the retry
/// path, so a failure is surfaced as-is.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HistoryClient {
    /// Build a client from connection settings.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::InvalidBaseUrl(config.base_url));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.get(format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        request
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(FetchError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HistoryClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, FetchError> {
        debug!(
            "GET /api/history (page={}, sort_by={})",
            query.page,
            query.sort_by.as_str()
        );
        let response = self
            .get("/api/history")
            .query(&[
                ("page", query.page.to_string()),
                ("sort_by", query.sort_by.as_str().to_string()),
            ])
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Self::check(response)
            .await?
            .json::<PageResponse>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }

    async fn count_matches(&self, query: &MatchQuery) -> Result<u64, FetchError> {
        debug!(
            "GET /api/history/count (query={:?}, kind={:?})",
            query.query, query.kind
        );
        let mut params = vec![("query", query.query.clone())];
        if let Some(kind) = query.kind {
            params.push(("media_type", kind.as_str().to_string()));
        }
        let response = self
            .get("/api/history/count")
            .query(&params)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let body = Self::check(response)
            .await?
            .json::<CountResponse>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))?;
        Ok(body.count)
    }
}
