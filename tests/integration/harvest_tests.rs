//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the marketplace gateway and run
//! full-scan sessions and rotation ticks end-to-end against an on-disk
//! database.

use review_harvester::config::{Config, HttpConfig, SourceEntry, StorageConfig};
use review_harvester::harvest::{
    HarvestContext, RotationScheduler, ScanStatus, SessionHarvester, StopReason, SystemClock,
};
use review_harvester::provider::{CollectorRegistry, MarketplaceClient, PageSource};
use review_harvester::state::{checkpoint_key, Checkpoint, ScanKind};
use review_harvester::storage::SqliteStorage;
use review_harvester::{ConfigError, HarvestConfig, HarvestError, Source};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn items_body(ids: &[&str]) -> ResponseTemplate {
    let items: Vec<_> = ids
        .iter()
        .map(|id| json!({ "id": id, "rating": 5, "body": format!("review {}", id) }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "items": items }))
}

fn test_harvest_config(page_budget: u32) -> HarvestConfig {
    HarvestConfig {
        page_budget,
        time_budget_secs: 60,
        page_delay_ms: 0,
        stripe_size: 3,
        safety_margin_secs: 10,
        recent_window_hours: 24,
    }
}

fn client_for(server: &MockServer, stores: &[&str]) -> MarketplaceClient {
    let mut client = MarketplaceClient::new(reqwest::Client::new(), 2);
    for store in stores {
        let base = Url::parse(&format!("{}/stores/{}", server.uri(), store)).unwrap();
        client.add_endpoint(store, base, None);
    }
    client
}

/// Mounts a three-page listing for `store`: [a, b], [c], then empty
async fn mount_listing(server: &MockServer, store: &str) {
    let items_path = format!("/stores/{}/items", store);

    // Mocks are matched in mount order, most specific first
    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .and(query_param("last_id", "b"))
        .respond_with(items_body(&["c"]))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .and(query_param("last_id", "c"))
        .respond_with(items_body(&[]))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .respond_with(items_body(&["a", "b"]))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_scan_resumes_across_processes() {
    let server = MockServer::start().await;
    mount_listing(&server, "north").await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let config = test_harvest_config(1);
    let client = client_for(&server, &["north"]);
    let source = Source::new("north", "North Store", "stripe");
    let clock = SystemClock;

    // First invocation: one page, then the page budget stops it
    {
        let storage = SqliteStorage::new(&db_path).unwrap();
        let harvester =
            SessionHarvester::new(&config, &client, HarvestContext::new(&storage, &clock));
        let outcome = harvester.run(&source).await.unwrap();

        assert_eq!(outcome.status, ScanStatus::Paused(StopReason::PageBudget));
        assert_eq!(outcome.pages_scanned, 1);
        assert_eq!(outcome.total_collected, 2);
    }

    // Second invocation with a fresh connection picks up at cursor "b"
    {
        let storage = SqliteStorage::new(&db_path).unwrap();
        let harvester =
            SessionHarvester::new(&config, &client, HarvestContext::new(&storage, &clock));
        let outcome = harvester.run(&source).await.unwrap();

        assert!(outcome.is_done());
        assert_eq!(outcome.pages_this_session, 1);
        assert_eq!(outcome.pages_scanned, 2);
        assert_eq!(outcome.total_collected, 3);
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    let checkpoint =
        Checkpoint::load(&storage, &checkpoint_key("north", ScanKind::FullScan)).unwrap();
    assert!(!checkpoint.active);
    assert_eq!(checkpoint.cursor, "c");
    assert_eq!(storage.count_items("north").unwrap(), 3);
    assert_eq!(storage.count_seen("north").unwrap(), 3);
}

#[tokio::test]
async fn test_tick_isolates_failing_source() {
    let server = MockServer::start().await;
    mount_listing(&server, "north").await;

    Mock::given(method("GET"))
        .and(path("/stores/south/items/recent"))
        .respond_with(items_body(&["x"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stores/west/items"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = SqliteStorage::new(&temp_dir.path().join("harvest.db")).unwrap();
    let config = test_harvest_config(300);
    let client = client_for(&server, &["north", "south", "west"]);
    let registry = CollectorRegistry::with_defaults(Arc::new(client));
    let clock = SystemClock;

    let pool = vec![
        Source::new("north", "North Store", "stripe"),
        Source::new("west", "West Store", "stripe"),
        Source::new("south", "South Store", "recent"),
    ];

    let scheduler =
        RotationScheduler::new(&config, &registry, HarvestContext::new(&storage, &clock));
    let outcome = scheduler.tick(&pool).await.unwrap();

    assert!(outcome.completed);
    assert_eq!(outcome.visited, vec!["north", "west", "south"]);
    assert_eq!(outcome.failed, vec!["west"]);
    assert_eq!(outcome.items_collected, 4);
    assert_eq!(outcome.next_offset, Some(1));
    assert_eq!(storage.count_items("north").unwrap(), 3);
    assert_eq!(storage.count_items("south").unwrap(), 1);

    let requests = server.received_requests().await.unwrap();
    let recent = requests
        .iter()
        .find(|r| r.url.path() == "/stores/south/items/recent")
        .expect("recent endpoint was called");
    assert!(recent.url.query_pairs().any(|(k, _)| k == "since"));

    // Second tick starts at the next source and finds nothing new
    let outcome = scheduler.tick(&pool).await.unwrap();
    assert_eq!(outcome.visited, vec!["west", "south", "north"]);
    assert_eq!(outcome.items_collected, 0);
}

#[tokio::test]
async fn test_rate_limited_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stores/north/items"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = client_for(&server, &["north"]);
    let source = Source::new("north", "North Store", "stripe");

    let result = client.fetch_page(&source, "").await;
    assert!(matches!(result, Err(HarvestError::RateLimited { .. })));
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stores/north/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, &["north"]);
    let source = Source::new("north", "North Store", "stripe");

    let result = client.fetch_page(&source, "").await;
    assert!(matches!(result, Err(HarvestError::Decode { .. })));
}

#[tokio::test]
async fn test_api_key_and_paging_parameters_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stores/north/items"))
        .and(header("Api-Key", "secret-key"))
        .and(query_param("limit", "2"))
        .and(query_param("last_id", "item-7"))
        .respond_with(items_body(&["item-8", "item-9"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut client = MarketplaceClient::new(reqwest::Client::new(), 2);
    let base = Url::parse(&format!("{}/stores/north/", server.uri())).unwrap();
    client.add_endpoint("north", base, Some("secret-key".to_string()));
    let source = Source::new("north", "North Store", "stripe");

    let items = client.fetch_page(&source, "item-7").await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "item-8");
    assert_eq!(items[1].fields.get("rating"), Some(&json!(5)));
}

#[tokio::test]
async fn test_server_error_leaves_checkpoint_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stores/north/items"))
        .and(query_param("last_id", "b"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stores/north/items"))
        .respond_with(items_body(&["a", "b"]))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = SqliteStorage::new(&temp_dir.path().join("harvest.db")).unwrap();
    let config = test_harvest_config(300);
    let client = client_for(&server, &["north"]);
    let source = Source::new("north", "North Store", "stripe");
    let clock = SystemClock;

    let harvester =
        SessionHarvester::new(&config, &client, HarvestContext::new(&storage, &clock));
    let result = harvester.run(&source).await;
    assert!(matches!(result, Err(HarvestError::Api { status: 503, .. })));

    let checkpoint = SessionHarvester::status(&storage, &source).unwrap();
    assert!(checkpoint.active);
    assert_eq!(checkpoint.cursor, "b");
    assert_eq!(checkpoint.pages_scanned, 1);
    assert_eq!(checkpoint.total_collected, 2);
}

#[tokio::test]
async fn test_tick_survives_source_without_api_key() {
    let server = MockServer::start().await;
    mount_listing(&server, "north").await;

    let entry = |id: &str, api_key_env: Option<&str>, enabled: bool| SourceEntry {
        id: id.to_string(),
        name: id.to_uppercase(),
        provider: "stripe".to_string(),
        base_url: format!("{}/stores/{}", server.uri(), id),
        api_key_env: api_key_env.map(str::to_string),
        enabled,
    };
    let config = Config {
        harvest: test_harvest_config(300),
        http: HttpConfig {
            user_agent: "review-harvester-test/1.0".to_string(),
            timeout_secs: 5,
            page_size: 2,
        },
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
        },
        sources: vec![
            entry("retired", Some("REVIEW_HARVESTER_IT_UNSET_RETIRED_KEY"), false),
            entry("east", Some("REVIEW_HARVESTER_IT_UNSET_EAST_KEY"), true),
            entry("north", None, true),
        ],
    };

    let client = MarketplaceClient::from_config(&config).unwrap();
    let registry = CollectorRegistry::with_defaults(Arc::new(client));
    let storage = SqliteStorage::open_in_memory().unwrap();
    let clock = SystemClock;

    let pool = config.active_sources();
    let scheduler = RotationScheduler::new(
        &config.harvest,
        &registry,
        HarvestContext::new(&storage, &clock),
    );
    let outcome = scheduler.tick(&pool).await.unwrap();

    assert!(outcome.completed);
    assert_eq!(outcome.visited, vec!["east", "north"]);
    assert_eq!(outcome.failed, vec!["east"]);
    assert_eq!(storage.count_items("north").unwrap(), 3);

    // A full scan of the unconfigured source fails as a configuration problem
    let east = Source::new("east", "EAST", "stripe");
    let client = MarketplaceClient::from_config(&config).unwrap();
    let harvester =
        SessionHarvester::new(&config.harvest, &client, HarvestContext::new(&storage, &clock));
    let result = harvester.run(&east).await;
    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::MissingEnv(_)))
    ));
}
