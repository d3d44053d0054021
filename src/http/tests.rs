//! Tests for the HTTP client module

use super::*;
use crate::auth::{AuthConfig, Authenticator};
use crate::error::Error;
use crate::types::BackoffType;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(base_url: &str) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(base_url)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(5),
            Duration::from_millis(20),
        )
        .no_rate_limit()
        .build()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.gateway_timeout_retries, 2);
    assert_eq!(config.initial_backoff, Duration::from_secs(1));
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert_eq!(
        config.default_headers.get("Accept"),
        Some(&JSON_API_MEDIA_TYPE.to_string())
    );
    assert!(config.user_agent.starts_with("tap-optiply/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(2))
        .max_retries(5)
        .gateway_timeout_retries(0)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(120));
    assert_eq!(config.connect_timeout, Duration::from_secs(2));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.gateway_timeout_retries, 0);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_request_config_builder() {
    let mut extra = std::collections::HashMap::new();
    extra.insert("filter[accountId]".to_string(), "42".to_string());

    let config = RequestConfig::new()
        .query("page[limit]", "50")
        .queries(&extra)
        .timeout(Duration::from_secs(10));

    assert_eq!(config.query.get("page[limit]"), Some(&"50".to_string()));
    assert_eq!(config.query.get("filter[accountId]"), Some(&"42".to_string()));
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
}

#[tokio::test]
async fn test_sends_json_api_headers_and_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(header("Accept", JSON_API_MEDIA_TYPE))
        .and(header("Content-Type", JSON_API_MEDIA_TYPE))
        .and(query_param("page[limit]", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        HttpClient::with_config(fast_config(&format!("{}/v1", mock_server.uri()))).unwrap();
    let body = client
        .get_json_with_config("/products", RequestConfig::new().query("page[limit]", "25"))
        .await
        .unwrap();

    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = client.get_json("/empty").await.unwrap();
    assert!(body.is_null());
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let err = client.get_json("/html").await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn test_http_client_404_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such resource"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let err = client.get_json("/missing").await.unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such resource");
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_client_retry_on_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = client.get_json("/flaky").await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_gateway_timeout_has_extra_budget() {
    let mock_server = MockServer::start().await;

    // 2 gateway retries + 2 general retries = 5 attempts in total
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(504))
        .up_to_n_times(4)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = client.get_json("/slow").await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_http_client_max_retries_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(5),
            Duration::from_millis(5),
        )
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client.get_json("/down").await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_rate_limit_response_honours_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = client.get_json("/busy").await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_rate_limit_without_retry_after_uses_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = tokio::time::timeout(Duration::from_secs(5), client.get_json("/busy"))
        .await
        .expect("429 without Retry-After should wait for the configured backoff")
        .unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_rate_limit_with_past_http_date_retries_immediately() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let body = tokio::time::timeout(Duration::from_secs(5), client.get_json("/busy"))
        .await
        .expect("past Retry-After date should not block")
        .unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_rate_limit_exhausted_is_rate_limited_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(fast_config(&mock_server.uri())).unwrap();
    let err = client.get_json("/busy").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
}

#[tokio::test]
async fn test_unauthorized_triggers_one_reauthentication() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "second-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(header("Authorization", "Bearer first-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(header("Authorization", "Bearer second-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2Password {
        token_url: format!("{}/oauth/token", mock_server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        username: "user".to_string(),
        password: "pass".to_string(),
        access_token: Some("first-token".to_string()),
        refresh_token: None,
        token_expires_at: Some(chrono::Utc::now().timestamp() + 3600),
    });

    let client = HttpClient::with_config(fast_config(&format!("{}/v1", mock_server.uri())))
        .unwrap()
        .with_authenticator(Arc::new(auth));

    let body = client.get_json("/products").await.unwrap();
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_persistent_unauthorized_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "useless-token",
            "expires_in": 3600
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2Password {
        token_url: format!("{}/oauth/token", mock_server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        username: "user".to_string(),
        password: "pass".to_string(),
        access_token: None,
        refresh_token: None,
        token_expires_at: None,
    });

    let client = HttpClient::with_config(fast_config(&mock_server.uri()))
        .unwrap()
        .with_authenticator(Arc::new(auth));

    let err = client.get_json("/forbidden").await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

#[test]
fn test_build_url() {
    let client = HttpClient::with_config(fast_config("https://api.optiply.com/v1/")).unwrap();
    assert_eq!(
        client.build_url("/products"),
        "https://api.optiply.com/v1/products"
    );
    assert_eq!(
        client.build_url("https://other.example.com/x"),
        "https://other.example.com/x"
    );
}

#[test]
fn test_calculate_backoff_exponential() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_secs(1),
            Duration::from_secs(60),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_secs(1));
    assert_eq!(client.calculate_backoff(1), Duration::from_secs(2));
    assert_eq!(client.calculate_backoff(2), Duration::from_secs(4));
    assert_eq!(client.calculate_backoff(10), Duration::from_secs(60));
}

#[test]
fn test_calculate_backoff_linear_and_constant() {
    let linear = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Linear,
                Duration::from_millis(100),
                Duration::from_secs(1),
            )
            .build(),
    )
    .unwrap();
    assert_eq!(linear.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));

    let constant = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Constant,
                Duration::from_millis(100),
                Duration::from_secs(1),
            )
            .build(),
    )
    .unwrap();
    assert_eq!(constant.calculate_backoff(5), Duration::from_millis(100));
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::new().unwrap();
    let debug = format!("{client:?}");
    assert!(debug.contains("HttpClient"));
    assert!(debug.contains("has_rate_limiter: true"));
    assert!(client.has_rate_limiter());
    assert!(client.authenticator().is_none());
}
