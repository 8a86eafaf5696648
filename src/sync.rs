//! The incremental-sync decision engine.
//!
//! One [`synchronize`] call brings a single collection up to date with its
//! feed:
//!
//! 1. Read the collection's watermark (most recent stored `content_date`).
//! 2. Fetch and decode the feed, newest-first.
//! 3. Stop early when the feed's head is not newer than the watermark.
//! 4. Otherwise walk items in feed order, treating every item before the
//!    first not-newer one as a candidate.
//! 5. Enrich each candidate (image download, page scrape) and assemble the
//!    canonical [`Post`] records.
//! 6. Append the batch to the store, which skips duplicate ids.
//!
//! Enrichment is all-or-nothing per run: a failed image download or an
//! unfetchable page aborts the whole call with nothing stored. The one
//! recoverable per-candidate condition is a page with no usable post
//! identifier — that candidate is dropped and the walk continues, since
//! storing it in a degraded form would poison the duplicate-id check.

use crate::config::FeedConfig;
use crate::enrich::{self, EnrichError};
use crate::feed::{self, FeedError};
use crate::images::{ImageError, ImageResolver};
use crate::models::{FeedItem, Post};
use crate::store::{JsonStore, StoreError};
use crate::utils::image_slug;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("feed at {url} has no items")]
    EmptyFeed { url: String },
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Enrich(#[from] EnrichError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one synchronize run for one feed.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// The posts assembled this run, in feed order (newest first).
    pub posts: Vec<Post>,
    /// How many of them the store actually appended (duplicates skipped).
    pub appended: usize,
}

/// The watermark rule: `true` means "do not treat as new".
///
/// A candidate is new only when both dates are present and the watermark is
/// strictly older.
pub fn is_not_newer(
    watermark: Option<DateTime<Utc>>,
    candidate: Option<DateTime<Utc>>,
) -> bool {
    match (watermark, candidate) {
        (Some(watermark), Some(candidate)) => watermark >= candidate,
        _ => true,
    }
}

/// Whether a feed item dated `candidate` counts as new work.
///
/// An empty collection has no watermark, and then everything in the feed is
/// new. Both the early-exit check and the per-item boundary walk go through
/// this one predicate, so the two call sites cannot drift.
fn is_new(watermark: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> bool {
    watermark.is_none() || !is_not_newer(watermark, Some(candidate))
}

/// Synchronize one feed into its collection.
///
/// # Returns
///
/// A [`SyncResult`] with the number of posts found and appended. Zero new
/// posts is a normal outcome, not an error.
#[instrument(level = "info", skip_all, fields(collection = %feed.collection))]
pub async fn synchronize(
    feed: &FeedConfig,
    store: &JsonStore,
    resolver: &ImageResolver,
) -> Result<SyncResult, SyncError> {
    let watermark = store.most_recent_content_date(&feed.collection).await?;
    let items = feed::read_feed(&feed.url).await?;

    let Some(newest) = items.first() else {
        return Err(SyncError::EmptyFeed {
            url: feed.url.clone(),
        });
    };

    info!(
        ?watermark,
        newest = %newest.pub_date,
        "Comparing feed head against stored watermark"
    );
    if !is_new(watermark, newest.pub_date) {
        info!("No new posts since last sync");
        return Ok(SyncResult::default());
    }

    // Feeds are served newest-first; the first not-newer item is the
    // boundary with everything already stored.
    let candidates: Vec<&FeedItem> = items
        .iter()
        .take_while(|item| is_new(watermark, item.pub_date))
        .collect();
    info!(count = candidates.len(), "Collected new-post candidates");

    let posts: Vec<Post> = stream::iter(candidates)
        .then(|item| build_post(feed, item, resolver))
        .try_collect::<Vec<Option<Post>>>()
        .await?
        .into_iter()
        .flatten()
        .collect();

    let appended = store.append_posts(&feed.collection, &posts).await?;

    info!(posts_found = posts.len(), appended, "Synchronize run complete");
    Ok(SyncResult { posts, appended })
}

/// Enrich one candidate and assemble its [`Post`].
///
/// Returns `Ok(None)` when the candidate must be dropped (no identifier on
/// its page, or an identifier that is not numeric); every other failure
/// propagates and aborts the run.
async fn build_post(
    feed: &FeedConfig,
    item: &FeedItem,
    resolver: &ImageResolver,
) -> Result<Option<Post>, SyncError> {
    let image_local = match &item.enclosure_url {
        Some(enclosure_url) => {
            let stem = image_slug(&item.title);
            resolver
                .resolve(enclosure_url, &stem, &feed.collection)
                .await?
        }
        None => String::new(),
    };

    let engagement = match enrich::enrich(&item.link, &feed.url).await {
        Ok(engagement) => engagement,
        Err(EnrichError::NoIdentifierFound { url }) => {
            warn!(%url, "Page has no post identifier, dropping candidate");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let Ok(id) = engagement.content_id.parse::<i64>() else {
        warn!(
            link = %item.link,
            content_id = %engagement.content_id,
            "Non-numeric post identifier, dropping candidate"
        );
        return Ok(None);
    };

    Ok(Some(Post {
        id,
        title: item.title.clone(),
        link: item.link.clone(),
        subtitle: item.description.clone(),
        name: engagement
            .author_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| feed.fallback_author().to_string()),
        image_local,
        reaction_count: parse_count(engagement.reaction_count.as_deref()),
        comment_count: parse_count(engagement.comment_count.as_deref()),
        content_date: item.pub_date,
    }))
}

fn parse_count(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0)
}
