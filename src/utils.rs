//! Utility functions for filename derivation and file system checks.
//!
//! Helpers for turning post titles into filesystem-safe image stems, for
//! pulling a usable extension out of an image URL, and for validating
//! output directories at startup.

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Convert a post title to a filesystem-safe image stem.
///
/// Lowercases the title, replaces every non-alphanumeric character with a
/// hyphen, collapses runs of hyphens, and trims hyphens from both ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(image_slug("The Great Escape"), "the-great-escape");
/// assert_eq!(image_slug("Hello, World!"), "hello-world");
/// ```
pub fn image_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Extract a file extension from an image URL, ignoring any query string.
///
/// Returns `None` when the URL has no plausible extension, so callers can
/// fall back to an extensionless filename.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(extension_from_url("https://cdn.example.com/a/cover.jpg?w=600"), Some("jpg"));
/// assert_eq!(extension_from_url("https://cdn.example.com/a/cover"), None);
/// ```
pub fn extension_from_url(url: &str) -> Option<&str> {
    let ext = url
        .rsplit('.')
        .next()?
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    if ext.is_empty()
        || ext.len() > 5
        || ext.contains('/')
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        None
    } else {
        Some(ext)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
