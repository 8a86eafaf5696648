//! # Substack Sync
//!
//! A feed synchronization pipeline that keeps a local document store up to
//! date with a set of Substack blogs. For each configured feed it finds the
//! posts published since the last run, scrapes engagement data from each
//! post's page, downloads cover images under content-addressed names, and
//! appends the finished records to the blog's collection.
//!
//! ## Features
//!
//! - Incremental sync: only items newer than the collection's stored
//!   watermark are fetched and enriched
//! - Engagement enrichment: reaction count, comment count, and author name
//!   scraped from each post's rendered page
//! - Content-addressed image storage (identical bytes, identical name)
//! - Duplicate-id protection on every append
//!
//! ## Usage
//!
//! ```sh
//! substack_sync -c feeds.yaml -d ./data -i ./images
//! ```
//!
//! ## Architecture
//!
//! Feeds are processed strictly one after another; a failure in one feed is
//! logged and does not prevent the remaining feeds from being attempted.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use substack_sync::cli::Cli;
use substack_sync::config;
use substack_sync::images::ImageResolver;
use substack_sync::store::JsonStore;
use substack_sync::sync;
use substack_sync::utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("substack_sync starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.data_dir, ?args.images_dir, "Parsed CLI arguments");

    // Early check: ensure both output directories are writable
    for dir in [&args.data_dir, &args.images_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Load feed configuration ----
    let feeds = config::load_feeds(Path::new(&args.config))?;
    if feeds.is_empty() {
        info!(config = %args.config, "No feeds configured, nothing to do");
        return Ok(());
    }

    let store = JsonStore::new(&args.data_dir);
    let resolver = ImageResolver::new(&args.images_dir);

    // ---- Synchronize each feed, one at a time ----
    let mut total_found = 0usize;
    let mut total_appended = 0usize;
    let mut failed_feeds = 0usize;

    for feed in &feeds {
        info!(collection = %feed.collection, url = %feed.url, "Synchronizing feed");

        match sync::synchronize(feed, &store, &resolver).await {
            Ok(result) => {
                info!(
                    collection = %feed.collection,
                    posts_found = result.posts.len(),
                    posts_appended = result.appended,
                    "Feed synchronized"
                );
                total_found += result.posts.len();
                total_appended += result.appended;
            }
            Err(e) => {
                failed_feeds += 1;
                error!(
                    collection = %feed.collection,
                    error = %e,
                    "Feed synchronization failed; continuing with remaining feeds"
                );
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        feeds = feeds.len(),
        failed = failed_feeds,
        posts_found = total_found,
        posts_appended = total_appended,
        "Execution complete"
    );

    Ok(())
}
