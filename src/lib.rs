//! # Substack Sync
//!
//! Incrementally synchronizes a set of Substack blog feeds into a local
//! per-collection document store. Each run determines which posts are new
//! since the last synchronization, enriches every new post with engagement
//! data scraped from its rendered page, downloads its cover image under a
//! content-addressed name, and appends the finished records to storage
//! while skipping duplicate ids.
//!
//! ## Architecture
//!
//! The pipeline flows strictly downward:
//! 1. [`feed`] decodes `{site}/feed` into ordered items, newest first
//! 2. [`sync`] walks the items to the watermark boundary and drives enrichment
//! 3. [`enrich`] scrapes reaction/comment counts, author, and the post id
//! 4. [`images`] stores enclosure images under content-addressed names
//! 5. [`store`] appends the batch idempotently to the collection document

pub mod cli;
pub mod config;
pub mod enrich;
pub mod feed;
pub mod fetch;
pub mod images;
pub mod models;
pub mod store;
pub mod sync;
pub mod utils;
