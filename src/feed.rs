//! Substack RSS feed reader.
//!
//! Fetches `{site}/feed` and decodes the RSS 2.0 document into an ordered
//! list of [`FeedItem`]s. Substack serves feeds newest-first; the decoder
//! preserves document order and the sync engine relies on it.
//!
//! Item `pubDate` values are RFC 2822 (`Tue, 12 May 2020 16:08:48 GMT`).
//! An item with a malformed or missing date, or a missing link, poisons the
//! whole feed: incremental sync cannot safely pick a boundary in a feed
//! whose ordering it cannot trust.

use crate::fetch::{self, FetchError};
use crate::models::FeedItem;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed feed: {detail}")]
    Parse { detail: String },
}

impl FeedError {
    fn parse(detail: impl Into<String>) -> Self {
        FeedError::Parse {
            detail: detail.into(),
        }
    }
}

/// Fetch and decode the feed for a site.
///
/// # Arguments
///
/// * `site_url` - The blog's base URL; the feed lives at `{site_url}/feed`
///
/// # Returns
///
/// The feed's items in document order (newest first), or a [`FeedError`]
/// if the feed cannot be retrieved or decoded.
#[instrument(level = "info", skip_all, fields(%site_url))]
pub async fn read_feed(site_url: &str) -> Result<Vec<FeedItem>, FeedError> {
    let feed_url = format!("{}/feed", site_url.trim_end_matches('/'));
    let xml = fetch::fetch_text(&feed_url).await?;
    let items = parse_feed(&xml)?;
    info!(count = items.len(), "Decoded feed items");
    Ok(items)
}

/// Decode an RSS document into feed items, preserving document order.
///
/// Exposed separately from [`read_feed`] so decoding can be exercised
/// against fixture documents without a network.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<RawItem> = None;

    loop {
        match reader
            .read_event()
            .map_err(|e| FeedError::parse(e.to_string()))?
        {
            Event::Start(e) if e.name().as_ref() == b"item" => {
                current = Some(RawItem::default());
            }
            Event::End(e) if e.name().as_ref() == b"item" => {
                let raw = current
                    .take()
                    .ok_or_else(|| FeedError::parse("unexpected </item>"))?;
                items.push(raw.build()?);
            }
            Event::Start(e) => {
                if let Some(item) = current.as_mut() {
                    let field = match e.name().as_ref() {
                        b"title" => Some(Field::Title),
                        b"link" => Some(Field::Link),
                        b"description" => Some(Field::Description),
                        b"pubDate" => Some(Field::PubDate),
                        b"enclosure" => {
                            item.enclosure_url = enclosure_url(&e)?;
                            None
                        }
                        _ => None,
                    };
                    if let Some(field) = field {
                        let text = reader
                            .read_text(e.name())
                            .map_err(|e| FeedError::parse(e.to_string()))?;
                        item.set(field, text.into_owned());
                    }
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"enclosure" => {
                if let Some(item) = current.as_mut() {
                    item.enclosure_url = enclosure_url(&e)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(count = items.len(), "Parsed RSS document");
    Ok(items)
}

enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

#[derive(Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
    enclosure_url: Option<String>,
}

impl RawItem {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Title => self.title = Some(value),
            Field::Link => self.link = Some(value),
            Field::Description => self.description = Some(value),
            Field::PubDate => self.pub_date = Some(value),
        }
    }

    fn build(self) -> Result<FeedItem, FeedError> {
        let link = self
            .link
            .ok_or_else(|| FeedError::parse("item is missing <link>"))?;
        let pub_date = self
            .pub_date
            .ok_or_else(|| FeedError::parse(format!("item {link} is missing <pubDate>")))?;
        let pub_date = parse_pub_date(&pub_date)?;

        Ok(FeedItem {
            title: self.title.unwrap_or_default(),
            link,
            description: self.description.unwrap_or_default(),
            pub_date,
            enclosure_url: self.enclosure_url,
        })
    }
}

fn enclosure_url(e: &BytesStart<'_>) -> Result<Option<String>, FeedError> {
    let attr = e
        .try_get_attribute("url")
        .map_err(|e| FeedError::parse(e.to_string()))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| FeedError::parse(e.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn parse_pub_date(value: &str) -> Result<DateTime<Utc>, FeedError> {
    DateTime::parse_from_rfc2822(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FeedError::parse(format!("bad pubDate {value:?}: {e}")))
}
