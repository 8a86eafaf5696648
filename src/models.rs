//! Data models for feed items, scraped engagement data, and stored posts.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedItem`]: A raw entry decoded from a Substack RSS feed
//! - [`EngagementData`]: Signals scraped from a post's rendered HTML page
//! - [`Post`]: The canonical persisted record, one per distinct post
//!
//! `FeedItem` and `EngagementData` live only for the duration of a sync run;
//! a [`Post`] is assembled from both, appended to storage once, and never
//! mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry decoded from an RSS feed, in feed order (newest first).
///
/// # Fields
///
/// * `title` - The post title
/// * `link` - Permalink to the post's HTML page
/// * `description` - The feed's description text for the post, may contain markup
/// * `pub_date` - Publication timestamp parsed from the feed's RFC 2822 `pubDate`
/// * `enclosure_url` - Cover image URL when the item carries an `<enclosure>`
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// The post title.
    pub title: String,
    /// Permalink to the post's rendered page.
    pub link: String,
    /// The feed description for the post.
    pub description: String,
    /// Publication timestamp from the feed.
    pub pub_date: DateTime<Utc>,
    /// Cover image URL, when present.
    pub enclosure_url: Option<String>,
}

/// Engagement signals scraped from a post's rendered page.
///
/// Only `content_id` is mandatory: a page with no resolvable identifier is
/// rejected by the enricher, while missing counts or author name simply
/// leave those fields empty.
#[derive(Debug, Clone)]
pub struct EngagementData {
    /// Reaction count as displayed on the page, numeric-looking when present.
    pub reaction_count: Option<String>,
    /// Comment count as displayed on the page.
    pub comment_count: Option<String>,
    /// Author display name from the profile block.
    pub author_name: Option<String>,
    /// The post identifier embedded in the page's internal links.
    pub content_id: String,
}

/// The canonical persisted record for one post.
///
/// Stored inside a per-collection JSON document as an element of its `data`
/// array. `id` values are unique within a collection; the store skips any
/// append whose id already exists.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    /// Identifier parsed from the page's internal post links.
    pub id: i64,
    /// The post title.
    pub title: String,
    /// Permalink to the post.
    pub link: String,
    /// The feed description for the post.
    pub subtitle: String,
    /// Author display name, or the feed's configured fallback.
    pub name: String,
    /// Storage-relative path of the downloaded cover image, empty when none.
    pub image_local: String,
    /// Number of reactions at sync time.
    pub reaction_count: i64,
    /// Number of comments at sync time.
    pub comment_count: i64,
    /// Publication timestamp; the collection watermark is the maximum of these.
    pub content_date: DateTime<Utc>,
}
