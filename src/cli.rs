//! Command-line interface definitions for the sync tool.
//!
//! This module defines the CLI arguments and options using the `clap` crate.

use clap::Parser;

/// Command-line arguments for the feed synchronizer.
///
/// # Examples
///
/// ```sh
/// # Synchronize every feed listed in feeds.yaml
/// substack_sync -c feeds.yaml -d ./data -i ./images
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML file listing the feeds to synchronize
    #[arg(short, long, default_value = "feeds.yaml")]
    pub config: String,

    /// Directory holding the per-collection JSON documents
    #[arg(short, long, default_value = "./data")]
    pub data_dir: String,

    /// Directory where downloaded post images are stored
    #[arg(short, long, default_value = "./images")]
    pub images_dir: String,
}
