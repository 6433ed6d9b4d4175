//! HTTP transport seam.
//!
//! The engine only needs whole-resource and byte-range GETs; everything else
//! (connection reuse, TLS, timeouts) lives behind [`MediaFetcher`] so tests
//! can substitute an in-memory implementation.

use async_trait::async_trait;
use bytes::Bytes;
use playlist::ByteRange;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, trace};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },

    /// A range request answered with anything but 206. Distinguished from
    /// [`FetchError::Status`] so callers can tell a range problem apart from
    /// a plain transport failure.
    #[error("range request for {url} not satisfied (status {status})")]
    RangeNotSatisfied { url: String, status: StatusCode },
}

impl FetchError {
    fn request(url: &Url, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }
}

/// Transport used for manifests, initialization sections and segments.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError>;

    /// Fetch `range.length` bytes starting at `range.offset`.
    async fn fetch_range(&self, url: &Url, range: &ByteRange) -> Result<Bytes, FetchError>;
}

/// [`MediaFetcher`] over a shared `reqwest::Client`, so segment requests to
/// the same host reuse connections.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        trace!("fetching {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::request(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.bytes().await.map_err(|e| FetchError::request(url, e))
    }

    async fn fetch_range(&self, url: &Url, range: &ByteRange) -> Result<Bytes, FetchError> {
        let last = range.offset + range.length.saturating_sub(1);
        debug!("fetching {url} bytes {}-{last}", range.offset);
        let response = self
            .client
            .get(url.clone())
            .header(header::RANGE, format!("bytes={}-{last}", range.offset))
            .send()
            .await
            .map_err(|e| FetchError::request(url, e))?;
        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::RangeNotSatisfied {
                url: url.to_string(),
                status,
            });
        }
        response.bytes().await.map_err(|e| FetchError::request(url, e))
    }
}
