//! Feed list configuration.
//!
//! The set of blogs to synchronize lives in a YAML file:
//!
//! ```yaml
//! feeds:
//!   - url: https://example.substack.com
//!     collection: example-blog
//!     fallback_author: Jane Doe
//! ```
//!
//! `fallback_author` is optional and fills the post's `name` field when the
//! page scrape yields no author.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const DEFAULT_FALLBACK_AUTHOR: &str = "Unknown";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid feed url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// One blog to synchronize.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// The blog's base URL; its feed is expected at `{url}/feed`.
    pub url: String,
    /// Name of the store collection the blog's posts accumulate in.
    pub collection: String,
    /// Author name to store when the page scrape yields none.
    #[serde(default)]
    pub fallback_author: Option<String>,
}

impl FeedConfig {
    pub fn fallback_author(&self) -> &str {
        self.fallback_author
            .as_deref()
            .unwrap_or(DEFAULT_FALLBACK_AUTHOR)
    }
}

#[derive(Debug, Deserialize)]
struct FeedsFile {
    feeds: Vec<FeedConfig>,
}

/// Load the feed list from a YAML file.
///
/// # Errors
///
/// [`ConfigError`] when the file cannot be read or does not deserialize.
pub fn load_feeds(path: &Path) -> Result<Vec<FeedConfig>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let parsed: FeedsFile =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })?;

    // Catch typos before any network or store activity happens.
    for feed in &parsed.feeds {
        url::Url::parse(&feed.url).map_err(|source| ConfigError::InvalidUrl {
            url: feed.url.clone(),
            source,
        })?;
    }

    info!(count = parsed.feeds.len(), path = %path.display(), "Loaded feed configuration");
    Ok(parsed.feeds)
}
