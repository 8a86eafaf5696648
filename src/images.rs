//! Content-addressed storage for post cover images.
//!
//! Downloads an enclosure image and stores it under the collection's
//! directory as `{stem}-{hash}{ext}`, where the hash is derived from the
//! file bytes. Identical content always converges to the same name no
//! matter what stem a run derived from the post title, and a changed remote
//! image produces a new name, so stored paths are cache-busting by
//! construction.

use crate::fetch::{self, FetchError};
use crate::utils::extension_from_url;
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, instrument};

const HASH_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to store image: {0}")]
    Io(#[from] io::Error),
}

/// Downloads enclosure images into a local directory tree.
///
/// The root directory is explicit construction state; nothing here reads
/// ambient process configuration.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    root: PathBuf,
}

impl ImageResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Download an image and store it under `{root}/{collection}/`.
    ///
    /// # Arguments
    ///
    /// * `image_url` - The enclosure URL to download
    /// * `stem` - Filesystem-safe stem derived from the post title
    /// * `collection` - Collection name, used as a namespacing directory
    ///
    /// # Returns
    ///
    /// The storage-relative path `/images/{collection}/{stem}-{hash}{ext}`.
    #[instrument(level = "info", skip_all, fields(%image_url, %collection))]
    pub async fn resolve(
        &self,
        image_url: &str,
        stem: &str,
        collection: &str,
    ) -> Result<String, ImageError> {
        let bytes = fetch::fetch_bytes(image_url).await?;

        let filename = match extension_from_url(image_url) {
            Some(ext) => format!("{stem}-{}.{ext}", short_hash(&bytes)),
            None => format!("{stem}-{}", short_hash(&bytes)),
        };

        let dir = self.root.join(collection);
        std::fs::create_dir_all(&dir)?;

        // Write through a temp file so a crash never leaves a half-written
        // image under a content-addressed name.
        let target = dir.join(&filename);
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| ImageError::Io(e.error))?;

        info!(path = %target.display(), bytes = bytes.len(), "Stored image");
        Ok(format!("/images/{collection}/{filename}"))
    }
}

fn short_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(HASH_LEN);
    for byte in digest.iter().take(HASH_LEN / 2) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
