use crate::feed::document::{parse_document, FeedDocument};
use futures::StreamExt;
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;

/// Default cap on a single feed response body.
pub const DEFAULT_MAX_FEED_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const MAX_REDIRECTS: usize = 5;

/// Errors that can occur while fetching and parsing one feed.
///
/// Every variant is per-source: the aggregation pipeline logs it and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Feed XML could not be parsed as RSS, RDF or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// HTTP client for feed sources.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl FeedClient {
    /// Builds a client with its own connection pool and redirect policy.
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .redirect(redirect_policy())
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(http, timeout, max_bytes))
    }

    /// Wraps an existing client (caller controls configuration).
    pub fn with_client(http: reqwest::Client, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            http,
            timeout,
            max_bytes,
        }
    }

    /// Fetches one feed URL and parses it into a [`FeedDocument`].
    ///
    /// Makes exactly one request; there are no retries.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] - Connection or TLS errors
    /// - [`FetchError::Timeout`] - Request exceeded the configured timeout
    /// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
    /// - [`FetchError::ResponseTooLarge`] - Body exceeded the size limit
    /// - [`FetchError::IncompleteResponse`] - Body shorter than Content-Length
    /// - [`FetchError::Parse`] - Invalid RSS/RDF/Atom XML
    pub async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let doc = parse_document(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
        tracing::debug!(
            feed = %url,
            items = doc.items.len(),
            bytes = bytes.len(),
            "Fetched feed"
        );
        Ok(doc)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_bytes).await
    }
}

/// Redirect policy with loop detection and limited hops.
///
/// Feedburner and CDN-fronted feeds commonly bounce through two or three
/// hops before reaching the XML.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("Too many redirects");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following feed redirect"
        );
        attempt.follow()
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
