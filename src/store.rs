//! Per-collection JSON document store.
//!
//! Each collection is a single document at `{root}/{collection}.json`,
//! shaped as `{ "data": [post, ...] }`. Posts are append-only: the store
//! refuses to add a post whose id already exists in the collection, and it
//! exposes the collection's most recent `content_date` so the sync engine
//! can pick its watermark.
//!
//! Writes replace the whole document through a temp file rename, so readers
//! never observe a torn document.

use crate::models::Post;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt collection document: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CollectionDoc {
    data: Vec<Post>,
}

/// File-backed document store, one JSON document per collection.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The most recent `content_date` stored in a collection.
    ///
    /// Returns `None` for a missing or empty collection; the sync engine
    /// treats that as "everything in the feed is already synchronized"
    /// unless the feed says otherwise.
    #[instrument(level = "debug", skip(self))]
    pub async fn most_recent_content_date(
        &self,
        collection: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let doc = self.load(collection).await?;
        Ok(doc.data.iter().map(|post| post.content_date).max())
    }

    /// Whether a post with this id already exists in the collection.
    pub async fn has_post(&self, collection: &str, id: i64) -> Result<bool, StoreError> {
        let doc = self.load(collection).await?;
        Ok(doc.data.iter().any(|post| post.id == id))
    }

    /// Append posts to a collection, skipping duplicate ids.
    ///
    /// Each post is checked against the collection contents (including
    /// posts appended earlier in the same batch) before being added. Safe
    /// to call with an empty batch.
    ///
    /// # Returns
    ///
    /// The number of posts actually appended.
    #[instrument(level = "info", skip_all, fields(%collection, batch = posts.len()))]
    pub async fn append_posts(
        &self,
        collection: &str,
        posts: &[Post],
    ) -> Result<usize, StoreError> {
        if posts.is_empty() {
            return Ok(0);
        }

        let mut doc = self.load(collection).await?;
        let mut appended = 0;
        for post in posts {
            if doc.data.iter().any(|existing| existing.id == post.id) {
                warn!(id = post.id, "Duplicate post id, skipping append");
                continue;
            }
            doc.data.push(post.clone());
            appended += 1;
        }

        if appended > 0 {
            self.write(collection, &doc)?;
        }
        info!(appended, total = doc.data.len(), "Appended posts to collection");
        Ok(appended)
    }

    async fn load(&self, collection: &str) -> Result<CollectionDoc, StoreError> {
        match tokio::fs::read_to_string(self.collection_path(collection)).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%collection, "Collection document does not exist yet");
                Ok(CollectionDoc::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, collection: &str, doc: &CollectionDoc) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(doc)?;

        let target = self.collection_path(collection);
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.json"))
    }
}
