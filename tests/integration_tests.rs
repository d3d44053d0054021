//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config file → token request → JSON:API
//! pages → Singer messages on the output.

use clap::Parser;
use serde_json::{json, Value};
use std::path::Path;
use tap_optiply::cli::{Cli, Runner};
use tap_optiply::Error;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn write_json(dir: &TempDir, name: &str, value: &Value) -> String {
    let file = dir.path().join(name);
    std::fs::write(&file, serde_json::to_string_pretty(value).unwrap()).unwrap();
    file.display().to_string()
}

fn config_file(dir: &TempDir, server: &MockServer) -> String {
    write_json(
        dir,
        "config.json",
        &json!({
            "apiCredentials": {
                "username": "user@example.com",
                "password": "secret",
                "client_id": "client",
                "client_secret": "client-secret",
                "account_id": 42
            },
            "api_url": server.uri(),
            "auth_url": format!("{}/oauth/token", server.uri()),
            "requests_per_second": 100,
            "page_size": 2
        }),
    )
}

fn catalog_file(dir: &TempDir, streams: &[&str]) -> String {
    let entries: Vec<Value> = streams
        .iter()
        .map(|name| {
            json!({
                "tap_stream_id": name,
                "metadata": [{"breadcrumb": [], "metadata": {"selected": true}}]
            })
        })
        .collect();
    write_json(dir, "catalog.json", &json!({ "streams": entries }))
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1"
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn resource(kind: &str, id: &str, updated_at: &str, attributes: Value) -> Value {
    let mut attrs = attributes;
    attrs["updatedAt"] = json!(updated_at);
    json!({"id": id, "type": kind, "attributes": attrs})
}

async fn run(args: &[&str]) -> (tap_optiply::Result<()>, Vec<Value>) {
    let mut argv = vec!["tap-optiply"];
    argv.extend_from_slice(args);
    let runner = Runner::new(Cli::parse_from(argv));

    let mut out = Vec::new();
    let result = runner.run_to(&mut out).await;
    let messages = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    (result, messages)
}

fn read_json(path: &str) -> Value {
    serde_json::from_str(&std::fs::read_to_string(Path::new(path)).unwrap()).unwrap()
}

// ============================================================================
// Sync
// ============================================================================

#[tokio::test]
async fn test_sync_emits_singer_messages() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("Authorization", "Bearer tok-1"))
        .and(query_param("filter[accountId]", "42"))
        .and(query_param("page[limit]", "2"))
        .and(query_param("page[offset]", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                resource("products", "1", "2024-03-01T10:00:00Z", json!({"name": "Chair", "stockLevel": 4})),
                resource("products", "2", "2024-03-02T10:00:00Z", json!({"name": "Table", "unknownField": true}))
            ],
            "links": {"next": format!("{}/products?page[limit]=2&page[offset]=2", server.uri())}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page[offset]", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [resource("products", "3", "2024-02-01T10:00:00Z", json!({"name": "Lamp"}))],
            "links": {}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/suppliers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "links": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_file(&dir, &server);
    let catalog = catalog_file(&dir, &["suppliers", "products"]);

    let (result, messages) = run(&["--config", &config, "--catalog", &catalog]).await;
    result.unwrap();

    // Streams run in definition order
    let schemas: Vec<&Value> = messages.iter().filter(|m| m["type"] == "SCHEMA").collect();
    assert_eq!(schemas.len(), 2);
    assert_eq!(schemas[0]["stream"], "products");
    assert_eq!(schemas[0]["key_properties"], json!(["id"]));
    assert_eq!(schemas[0]["bookmark_properties"], json!(["updatedAt"]));
    assert_eq!(schemas[1]["stream"], "suppliers");

    let records: Vec<&Value> = messages.iter().filter(|m| m["type"] == "RECORD").collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["record"]["id"], "1");
    assert_eq!(records[0]["record"]["name"], "Chair");
    assert!(records[1]["record"].get("unknownField").is_none());
    assert!(records[0]["time_extracted"].is_string());

    let last_state = messages
        .iter()
        .rev()
        .find(|m| m["type"] == "STATE")
        .unwrap();
    assert_eq!(
        last_state["value"]["bookmarks"]["products"],
        json!({"replication_key": "updatedAt", "replication_key_value": "2024-03-02T10:00:00Z"})
    );

    // Fetched token written back next to the credentials
    let saved = read_json(&config);
    assert_eq!(saved["apiCredentials"]["access_token"], "tok-1");
    assert_eq!(saved["apiCredentials"]["refresh_token"], "refresh-1");
    assert!(saved["apiCredentials"]["token_expires_at"].is_i64());
    assert_eq!(saved["api_url"], json!(server.uri()));
}

#[tokio::test]
async fn test_sync_resumes_from_state_bookmark() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/buyOrders"))
        .and(query_param("filter[updatedAt][GT]", "2024-05-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [resource("buyOrders", "7", "2024-05-03T00:00:00Z", json!({"totalValue": 12.5}))]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_file(&dir, &server);
    let catalog = catalog_file(&dir, &["buyOrders"]);
    let state = write_json(
        &dir,
        "state.json",
        &json!({"bookmarks": {"buyOrders": {
            "replication_key": "updatedAt",
            "replication_key_value": "2024-05-01T00:00:00Z"
        }}}),
    );

    let (result, messages) = run(&[
        "--config", &config, "--catalog", &catalog, "--state", &state,
    ])
    .await;
    result.unwrap();

    let records: Vec<&Value> = messages.iter().filter(|m| m["type"] == "RECORD").collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["record"]["totalValue"], json!(12.5));

    let last_state = messages.last().unwrap();
    assert_eq!(last_state["type"], "STATE");
    assert_eq!(
        last_state["value"]["bookmarks"]["buyOrders"]["replication_key_value"],
        "2024-05-03T00:00:00Z"
    );

    // State file is input only
    assert_eq!(
        read_json(&state)["bookmarks"]["buyOrders"]["replication_key_value"],
        "2024-05-01T00:00:00Z"
    );
}

#[tokio::test]
async fn test_sync_reuses_persisted_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/promotions"))
        .and(header("Authorization", "Bearer saved-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let expires_at = chrono::Utc::now().timestamp() + 3600;
    let config = write_json(
        &dir,
        "config.json",
        &json!({
            "username": "user@example.com",
            "password": "secret",
            "client_id": "client",
            "client_secret": "client-secret",
            "access_token": "saved-token",
            "token_expires_at": expires_at,
            "api_url": server.uri(),
            "auth_url": format!("{}/oauth/token", server.uri())
        }),
    );
    let catalog = catalog_file(&dir, &["promotions"]);

    let (result, messages) = run(&["--config", &config, "--catalog", &catalog]).await;
    result.unwrap();
    assert_eq!(messages.iter().filter(|m| m["type"] == "RECORD").count(), 0);
}

#[tokio::test]
async fn test_sync_fails_on_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_file(&dir, &server);
    let catalog = catalog_file(&dir, &["products"]);

    let (result, messages) = run(&["--config", &config, "--catalog", &catalog]).await;
    assert!(matches!(result, Err(Error::Auth { .. })));

    // SCHEMA is written before the first request
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["type"], "SCHEMA");
}

// ============================================================================
// Discover / Test / Config
// ============================================================================

#[tokio::test]
async fn test_discover_prints_catalog() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config_file(&dir, &server);

    let mut out = Vec::new();
    Runner::new(Cli::parse_from(["tap-optiply", "--config", &config, "--discover"]))
        .run_to(&mut out)
        .await
        .unwrap();

    let catalog: Value = serde_json::from_slice(&out).unwrap();
    let streams = catalog["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 11);
    assert_eq!(streams[0]["tap_stream_id"], "products");
    assert_eq!(streams[0]["replication_method"], "INCREMENTAL");
    // Discovery never calls the API
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_check() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page[limit]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [resource("products", "1", "2024-01-01T00:00:00Z", json!({}))]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_file(&dir, &server);

    let (result, messages) = run(&["--config", &config, "--test"]).await;
    result.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_merged_config_files() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = write_json(
        &dir,
        "base.json",
        &json!({"username": "user", "password": "pw", "client_id": "id"}),
    );
    let secrets = write_json(&dir, "secrets.json", &json!({"client_secret": "s"}));

    let (result, _) = run(&["--config", &base, "--discover"]).await;
    assert!(matches!(result, Err(Error::MissingConfigField { .. })));

    let mut out = Vec::new();
    Runner::new(Cli::parse_from([
        "tap-optiply", "--config", &base, "--config", &secrets, "--discover",
    ]))
    .run_to(&mut out)
    .await
    .unwrap();
    assert!(!out.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}
