//! Shared HTTP fetch layer.
//!
//! All network access goes through one process-wide [`reqwest::Client`]
//! carrying browser-like request headers — Substack answers the default
//! library user agent with 403s. The helpers here normalize failures into
//! [`FetchError`]: transport problems and non-success statuses both surface
//! as errors rather than as bodies.

use once_cell::sync::Lazy;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static CLIENT: Lazy<Client> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/rss+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .default_headers(headers)
        .build()
        .expect("reqwest client construction cannot fail with static headers")
});

/// An HTTP fetch failure: either the transport failed or the server
/// answered with a non-success status.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
}

/// Fetch a URL and return its body as text.
///
/// # Errors
///
/// Returns [`FetchError`] on transport failure or a non-2xx status.
pub async fn fetch_text(url: &str) -> Result<String, FetchError> {
    let response = send(url).await?;
    let body = response.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;
    debug!(%url, bytes = body.len(), "fetched text body");
    Ok(body)
}

/// Fetch a URL and return its body as raw bytes.
///
/// # Errors
///
/// Returns [`FetchError`] on transport failure or a non-2xx status.
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    let response = send(url).await?;
    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
    debug!(%url, bytes = body.len(), "fetched binary body");
    Ok(body.to_vec())
}

async fn send(url: &str) -> Result<reqwest::Response, FetchError> {
    let response = CLIENT
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}
