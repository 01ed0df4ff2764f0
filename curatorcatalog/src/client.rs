//! HTTP client for the Curator search endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Hit, SearchRequest, SearchResponse};

/// Default search endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://search.curator.atemkeng.eu/indexes/songs/search";

/// Default bearer token of the public index
pub const DEFAULT_API_KEY: &str = "masterKey";

/// Default timeout for every catalog request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "curatorcatalog/0.1.0";

/// Remote operations the catalog relies on
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Run one search request against the index
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// Fetch one raw hit from a related-song reference
    async fn fetch_hit(&self, url: &str) -> Result<Hit>;
}

/// Curator search HTTP client
///
/// Every request carries `Authorization: Bearer <api key>`.
///
/// ```no_run
/// use curatorcatalog::{CatalogApi, CuratorClient, SearchRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = CuratorClient::new()?;
/// let response = client.search(&SearchRequest::strict("lofi", 20)).await?;
/// println!("{} hits", response.hits.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CuratorClient {
    client: Client,
    search_url: String,
    api_key: String,
}

impl CuratorClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// The underlying HTTP client, shareable with probes
    pub fn http(&self) -> &Client {
        &self.client
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Catalog returned HTTP {}: {}", status.as_u16(), body);
            return Err(Error::status(status.as_u16(), body));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl CatalogApi for CuratorClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        debug!(
            "Searching q={:?} limit={} strategy={:?}",
            request.q, request.limit, request.matching_strategy
        );

        let response = self
            .client
            .post(&self.search_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let result: SearchResponse = Self::handle_response(response).await?;
        debug!("Search q={:?} returned {} hits", request.q, result.hits.len());
        Ok(result)
    }

    async fn fetch_hit(&self, url: &str) -> Result<Hit> {
        debug!("Fetching related hit {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::handle_response(response).await
    }
}

/// Builder for [`CuratorClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    search_url: String,
    api_key: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client; timeout and user agent are then ignored
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<CuratorClient> {
        if self.search_url.trim().is_empty() {
            return Err(Error::other("search URL must not be empty"));
        }

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()?,
        };

        Ok(CuratorClient {
            client,
            search_url: self.search_url,
            api_key: self.api_key,
        })
    }
}
