//! End-to-end synchronize runs against a mock Substack server.
//!
//! Each test stands up a wiremock server playing both the feed endpoint and
//! the post pages, points the sync engine at it with a temp-dir store, and
//! asserts on the resulting collection documents.

use chrono::{TimeZone, Utc};
use substack_sync::config::FeedConfig;
use substack_sync::images::ImageResolver;
use substack_sync::models::Post;
use substack_sync::store::JsonStore;
use substack_sync::sync::{self, SyncError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NEWEST: &str = "Sat, 20 Sep 2025 09:45:10 GMT";
const MIDDLE: &str = "Thu, 18 Sep 2025 08:00:00 GMT";
const OLDEST: &str = "Wed, 10 Sep 2025 08:00:00 GMT";

fn rss_item(site: &str, slug: &str, pub_date: &str, enclosure: Option<&str>) -> String {
    let enclosure = enclosure
        .map(|url| format!(r#"<enclosure url="{url}" length="1" type="image/jpeg"/>"#))
        .unwrap_or_default();
    format!(
        "<item>\
         <title>Post {slug}</title>\
         <link>{site}/p/{slug}</link>\
         <description>About {slug}</description>\
         <pubDate>{pub_date}</pubDate>\
         {enclosure}\
         </item>"
    )
}

fn rss_feed(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Blog</title><link>unused</link><description>test blog</description>{}</channel></rss>"#,
        items.concat()
    )
}

fn post_page(site: &str, id: &str) -> String {
    format!(
        r##"<html><head><title>ignored</title></head><body>
           <div class="like-button-container">12</div>
           <a class="post-ufi-comment-button" href="#">3</a>
           <div class="profile-hover-card-target">Jane Doe</div>
           <a data-href="{site}/i/{id}/comments">comments</a>
           <a data-href="{site}/i/{id}/share">share</a>
           </body></html>"##
    )
}

async fn mount_feed(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/rss+xml"))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, slug: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(format!("/p/{slug}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

fn feed_config(server: &MockServer, collection: &str) -> FeedConfig {
    FeedConfig {
        url: server.uri(),
        collection: collection.to_string(),
        fallback_author: Some("Fallback Author".to_string()),
    }
}

/// A post already in storage, dated 2025-09-17: between OLDEST/MIDDLE.
fn watermark_post() -> Post {
    Post {
        id: 999,
        title: "Seeded".to_string(),
        link: "https://example.substack.com/p/seeded".to_string(),
        subtitle: String::new(),
        name: "Jane Doe".to_string(),
        image_local: String::new(),
        reaction_count: 0,
        comment_count: 0,
        content_date: Utc.with_ymd_and_hms(2025, 9, 17, 9, 45, 10).unwrap(),
    }
}

#[tokio::test]
async fn boundary_stops_at_first_item_not_newer_than_watermark() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[
        rss_item(&site, "newest", NEWEST, None),
        rss_item(&site, "middle", MIDDLE, None),
        rss_item(&site, "oldest", OLDEST, None),
    ]);
    mount_feed(&server, feed).await;
    mount_page(&server, "newest", post_page(&site, "201")).await;
    mount_page(&server, "middle", post_page(&site, "202")).await;
    // The boundary item must never be fetched.
    Mock::given(method("GET"))
        .and(path("/p/oldest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());
    store
        .append_posts("blog", &[watermark_post()])
        .await
        .unwrap();

    let config = feed_config(&server, "blog");
    let result = sync::synchronize(&config, &store, &resolver).await.unwrap();

    assert_eq!(result.posts.len(), 2);
    assert_eq!(result.appended, 2);
    // Batch order follows feed order, newest candidate first.
    assert_eq!(result.posts[0].id, 201);
    assert_eq!(result.posts[1].id, 202);
    assert!(store.has_post("blog", 201).await.unwrap());
    assert!(store.has_post("blog", 202).await.unwrap());

    // Watermark advanced to the newest item.
    assert_eq!(
        store.most_recent_content_date("blog").await.unwrap(),
        Some(Utc.with_ymd_and_hms(2025, 9, 20, 9, 45, 10).unwrap())
    );
}

#[tokio::test]
async fn absent_watermark_syncs_every_item() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[
        rss_item(&site, "newest", NEWEST, None),
        rss_item(&site, "middle", MIDDLE, None),
        rss_item(&site, "oldest", OLDEST, None),
    ]);
    mount_feed(&server, feed).await;
    mount_page(&server, "newest", post_page(&site, "201")).await;
    mount_page(&server, "middle", post_page(&site, "202")).await;
    mount_page(&server, "oldest", post_page(&site, "203")).await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());

    let config = feed_config(&server, "blog");
    let result = sync::synchronize(&config, &store, &resolver).await.unwrap();

    assert_eq!(result.posts.len(), 3);
    assert_eq!(result.appended, 3);
}

#[tokio::test]
async fn second_run_against_unchanged_feed_appends_nothing() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[
        rss_item(&site, "newest", NEWEST, None),
        rss_item(&site, "middle", MIDDLE, None),
    ]);
    mount_feed(&server, feed).await;
    mount_page(&server, "newest", post_page(&site, "201")).await;
    mount_page(&server, "middle", post_page(&site, "202")).await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());
    let config = feed_config(&server, "blog");

    let first = sync::synchronize(&config, &store, &resolver).await.unwrap();
    assert_eq!(first.appended, 2);

    let second = sync::synchronize(&config, &store, &resolver).await.unwrap();
    assert!(second.posts.is_empty());
    assert_eq!(second.appended, 0);
}

#[tokio::test]
async fn candidate_without_identifier_is_dropped_alone() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[
        rss_item(&site, "newest", NEWEST, None),
        rss_item(&site, "middle", MIDDLE, None),
    ]);
    mount_feed(&server, feed).await;
    // Newest page carries no internal post references at all.
    mount_page(
        &server,
        "newest",
        "<html><body><p>nothing here</p></body></html>".to_string(),
    )
    .await;
    mount_page(&server, "middle", post_page(&site, "202")).await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());

    let config = feed_config(&server, "blog");
    let result = sync::synchronize(&config, &store, &resolver).await.unwrap();

    assert_eq!(result.posts.len(), 1);
    assert_eq!(result.appended, 1);
    assert!(store.has_post("blog", 202).await.unwrap());
}

#[tokio::test]
async fn page_fetch_failure_aborts_run_without_store_mutation() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[
        rss_item(&site, "newest", NEWEST, None),
        rss_item(&site, "middle", MIDDLE, None),
    ]);
    mount_feed(&server, feed).await;
    mount_page(&server, "newest", post_page(&site, "201")).await;
    Mock::given(method("GET"))
        .and(path("/p/middle"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());

    let config = feed_config(&server, "blog");
    let err = sync::synchronize(&config, &store, &resolver)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Enrich(_)));
    // Nothing was stored, not even the post whose page fetch succeeded.
    assert!(!store.has_post("blog", 201).await.unwrap());
}

#[tokio::test]
async fn enclosure_image_is_stored_under_content_hash() {
    let server = MockServer::start().await;
    let site = server.uri();

    let cover_url = format!("{site}/cdn/cover.jpg?w=600");
    let feed = rss_feed(&[rss_item(&site, "newest", NEWEST, Some(&cover_url))]);
    mount_feed(&server, feed).await;
    mount_page(&server, "newest", post_page(&site, "201")).await;
    Mock::given(method("GET"))
        .and(path("/cdn/cover.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .mount(&server)
        .await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());

    let config = feed_config(&server, "blog");
    let result = sync::synchronize(&config, &store, &resolver).await.unwrap();
    assert_eq!(result.appended, 1);

    let raw = std::fs::read_to_string(data_dir.path().join("blog.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let image_local = doc["data"][0]["image_local"].as_str().unwrap();

    assert!(image_local.starts_with("/images/blog/post-newest-"));
    assert!(image_local.ends_with(".jpg"));

    // The physical file exists under the collection's image directory.
    let filename = image_local.rsplit('/').next().unwrap();
    assert!(images_dir.path().join("blog").join(filename).exists());
}

#[tokio::test]
async fn empty_feed_is_an_error() {
    let server = MockServer::start().await;

    mount_feed(&server, rss_feed(&[])).await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());

    let config = feed_config(&server, "blog");
    let err = sync::synchronize(&config, &store, &resolver)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::EmptyFeed { .. }));
}

#[tokio::test]
async fn stale_feed_head_short_circuits_before_any_page_fetch() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[rss_item(&site, "oldest", OLDEST, None)]);
    mount_feed(&server, feed).await;
    Mock::given(method("GET"))
        .and(path("/p/oldest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());
    store
        .append_posts("blog", &[watermark_post()])
        .await
        .unwrap();

    let config = feed_config(&server, "blog");
    let result = sync::synchronize(&config, &store, &resolver).await.unwrap();

    assert!(result.posts.is_empty());
    assert_eq!(result.appended, 0);
}

#[tokio::test]
async fn scraped_engagement_lands_in_stored_post() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[rss_item(&site, "newest", NEWEST, None)]);
    mount_feed(&server, feed).await;
    mount_page(&server, "newest", post_page(&site, "201")).await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());

    let config = feed_config(&server, "blog");
    sync::synchronize(&config, &store, &resolver).await.unwrap();

    let raw = std::fs::read_to_string(data_dir.path().join("blog.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let post = &doc["data"][0];

    assert_eq!(post["id"], 201);
    assert_eq!(post["title"], "Post newest");
    assert_eq!(post["subtitle"], "About newest");
    assert_eq!(post["name"], "Jane Doe");
    assert_eq!(post["reaction_count"], 12);
    assert_eq!(post["comment_count"], 3);
    assert_eq!(post["image_local"], "");
}

#[tokio::test]
async fn missing_author_falls_back_to_configured_name() {
    let server = MockServer::start().await;
    let site = server.uri();

    let feed = rss_feed(&[rss_item(&site, "newest", NEWEST, None)]);
    mount_feed(&server, feed).await;
    // Page with an identifier but no profile block.
    mount_page(
        &server,
        "newest",
        format!(r#"<html><body><a data-href="{site}/i/201/comments">c</a></body></html>"#),
    )
    .await;

    let data_dir = tempfile::tempdir().unwrap();
    let images_dir = tempfile::tempdir().unwrap();
    let store = JsonStore::new(data_dir.path());
    let resolver = ImageResolver::new(images_dir.path());

    let config = feed_config(&server, "blog");
    sync::synchronize(&config, &store, &resolver).await.unwrap();

    let raw = std::fs::read_to_string(data_dir.path().join("blog.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(doc["data"][0]["name"], "Fallback Author");
    assert_eq!(doc["data"][0]["reaction_count"], 0);
}
