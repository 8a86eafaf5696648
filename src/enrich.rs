//! Engagement scraping for rendered post pages.
//!
//! Substack post pages embed everything we need in the markup: reaction and
//! comment counts in button labels, the author name in a profile hover card,
//! and the numeric post id in `data-href` attributes pointing back at the
//! site's own `/i/{id}/...` URLs. All knowledge of that markup shape lives in
//! this module — when Substack changes a class name, this is the only file
//! that should need touching.
//!
//! # Identifier selection
//!
//! A page references several post ids (recommendations, comment widgets, the
//! post itself). The post's own id is the one referenced most often, so we
//! tally every `data-href` prefixed by `{site}/i/` and pick the most frequent
//! candidate, first-seen winning ties so the choice is deterministic.

use crate::fetch::{self, FetchError};
use crate::models::EngagementData;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument};

// Queries are scoped under `body`, which keeps head metadata out of the
// tally; comments and script bodies are not element nodes, so they never
// match a selector in the first place.
static IDENTIFIER_REFS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body [data-href]").unwrap());
static LIKE_BUTTON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".like-button-container").unwrap());
static COMMENT_BUTTON: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.post-ufi-comment-button").unwrap());
static PROFILE_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.profile-hover-card-target").unwrap());

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no post identifier found on {url}")]
    NoIdentifierFound { url: String },
}

/// Fetch a post's page and extract its engagement data.
///
/// # Arguments
///
/// * `post_url` - Permalink of the post
/// * `site_url` - The blog's base URL, used to recognize internal post links
///
/// # Errors
///
/// [`EnrichError::Fetch`] when the page cannot be retrieved;
/// [`EnrichError::NoIdentifierFound`] when no internal `/i/{id}/` reference
/// appears anywhere in the markup.
#[instrument(level = "info", skip_all, fields(%post_url))]
pub async fn enrich(post_url: &str, site_url: &str) -> Result<EngagementData, EnrichError> {
    let html = fetch::fetch_text(post_url).await?;
    parse_engagement(&html, site_url).ok_or_else(|| EnrichError::NoIdentifierFound {
        url: post_url.to_string(),
    })
}

/// Extract engagement data from already-fetched page markup.
///
/// Returns `None` when the page carries no internal post reference; the
/// counts and author name are each optional and their absence is not an
/// error.
pub fn parse_engagement(html: &str, site_url: &str) -> Option<EngagementData> {
    let document = Html::parse_document(html);

    let prefix = format!("{}/i/", site_url.trim_end_matches('/'));
    let ids: Vec<&str> = document
        .select(&IDENTIFIER_REFS)
        .filter_map(|el| el.value().attr("data-href"))
        .filter_map(|href| href.strip_prefix(prefix.as_str()))
        .map(|rest| rest.split('/').next().unwrap_or(rest))
        .filter(|id| !id.is_empty())
        .collect();

    let counts = ids.iter().counts();
    let max = counts.values().copied().max()?;
    let content_id = ids
        .iter()
        .unique()
        .find(|id| counts[*id] == max)?
        .to_string();

    debug!(
        candidates = counts.len(),
        occurrences = max,
        %content_id,
        "Selected post identifier"
    );

    Some(EngagementData {
        reaction_count: first_text(&document, &LIKE_BUTTON),
        comment_count: first_text(&document, &COMMENT_BUTTON),
        author_name: first_text(&document, &PROFILE_NAME),
        content_id,
    })
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().map(|el| {
        el.text()
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string()
    })
}
