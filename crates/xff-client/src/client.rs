//! RIPEstat API client.

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;
use xff_core::{AnnouncedPrefixesResponse, Asn, PrefixFilter, Result, RotorError};

/// The RIPEstat data API base URL
const DEFAULT_BASE_URL: &str = "https://stat.ripe.net";

/// Announced-prefixes data call
const ANNOUNCED_PREFIXES_PATH: &str = "/data/announced-prefixes/data.json";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the RIPEstat registry
#[derive(Clone)]
pub struct RipeStatClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    base_url: String,
    filter: PrefixFilter,
}

impl RipeStatClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        RipeStatClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> RipeStatClientBuilder {
        RipeStatClientBuilder::new()
    }

    /// Mask window applied by [`PrefixSource::fetch_prefixes`](crate::PrefixSource)
    #[must_use]
    pub fn filter(&self) -> &PrefixFilter {
        &self.inner.filter
    }

    /// Fetch the raw announced-prefixes response for `asn`
    #[instrument(skip(self, asn), fields(asn = %asn))]
    pub async fn announced_prefixes(&self, asn: Asn) -> Result<AnnouncedPrefixesResponse> {
        let resource = asn.resource();
        let response: AnnouncedPrefixesResponse = self
            .get_with_query(ANNOUNCED_PREFIXES_PATH, &[("resource", resource.as_str())])
            .await?;

        if response.status.as_deref() == Some("error") {
            return Err(RotorError::SourceUnavailable(format!(
                "registry reported an error for {resource}"
            )));
        }

        Ok(response)
    }

    /// Perform a GET request with query parameters
    async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.build_url(path, params)?;
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RotorError::SourceUnavailable(e.to_string()))?;

        Self::handle_response(response).await
    }

    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.inner.base_url, path))
            .map_err(|e| RotorError::Config(format!("invalid registry URL: {e}")))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    /// Decode a JSON response, mapping every failure to `SourceUnavailable`
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!("Rate limited by RIPEstat");
            }
            return Err(RotorError::SourceUnavailable(format!(
                "registry returned status {}: {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RotorError::SourceUnavailable(e.to_string()))?;

        serde_json::from_str(&body)
            .map_err(|e| RotorError::SourceUnavailable(format!("malformed registry response: {e}")))
    }
}

/// Pull the first message out of a RIPEstat error body, or fall back to the raw text.
///
/// Error bodies carry `"messages": [["error", "text"], ...]`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("messages")?
                .as_array()?
                .iter()
                .find_map(|m| m.get(1)?.as_str().map(String::from))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Builder for configuring a [`RipeStatClient`]
pub struct RipeStatClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    filter: PrefixFilter,
}

impl Default for RipeStatClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RipeStatClientBuilder {
    /// Create a builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("xff-rotor/{}", env!("CARGO_PKG_VERSION")),
            filter: PrefixFilter::default(),
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set the usable-prefix filter
    #[must_use]
    pub fn filter(mut self, filter: PrefixFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<RipeStatClient> {
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| RotorError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(RipeStatClient {
            inner: Arc::new(ClientInner {
                http,
                base_url: self.base_url,
                filter: self.filter,
            }),
        })
    }
}
