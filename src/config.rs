//! Tap configuration
//!
//! Loads the JSON config file(s) handed to the tap (or `TAP_OPTIPLY_*`
//! environment variables), validates the credentials and exposes typed
//! settings for the auth and HTTP layers.

use crate::auth::{AuthConfig, CachedToken, TokenListener};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default API base URL
pub const DEFAULT_API_URL: &str = "https://api.optiply.com/v1";

/// Default OAuth2 token endpoint
pub const DEFAULT_AUTH_URL: &str = "https://dashboard.optiply.nl/api/auth/oauth/token";

/// Prefix of environment variables read by `--config ENV`
pub const ENV_PREFIX: &str = "TAP_OPTIPLY_";

/// Default request rate
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

// ============================================================================
// Settings Catalog
// ============================================================================

/// Describes one accepted setting (used by `--about` and env mapping)
#[derive(Debug, Clone, Copy)]
pub struct ConfigField {
    pub name: &'static str,
    pub field_type: &'static str,
    pub required: bool,
    pub secret: bool,
    pub description: &'static str,
    pub default: Option<&'static str>,
}

/// All settings understood by the tap
pub static SETTINGS: &[ConfigField] = &[
    ConfigField {
        name: "username",
        field_type: "string",
        required: true,
        secret: false,
        description: "Optiply account username",
        default: None,
    },
    ConfigField {
        name: "password",
        field_type: "string",
        required: true,
        secret: true,
        description: "Optiply account password",
        default: None,
    },
    ConfigField {
        name: "client_id",
        field_type: "string",
        required: true,
        secret: false,
        description: "OAuth client ID",
        default: None,
    },
    ConfigField {
        name: "client_secret",
        field_type: "string",
        required: true,
        secret: true,
        description: "OAuth client secret",
        default: None,
    },
    ConfigField {
        name: "account_id",
        field_type: "string",
        required: false,
        secret: false,
        description: "Restrict every stream to this account",
        default: None,
    },
    ConfigField {
        name: "access_token",
        field_type: "string",
        required: false,
        secret: true,
        description: "Access token from a previous run",
        default: None,
    },
    ConfigField {
        name: "refresh_token",
        field_type: "string",
        required: false,
        secret: true,
        description: "Refresh token from a previous run",
        default: None,
    },
    ConfigField {
        name: "token_expires_at",
        field_type: "integer",
        required: false,
        secret: false,
        description: "Unix timestamp at which access_token expires",
        default: None,
    },
    ConfigField {
        name: "start_date",
        field_type: "date-time",
        required: false,
        secret: false,
        description: "Earliest updatedAt to sync when no bookmark exists",
        default: None,
    },
    ConfigField {
        name: "page_size",
        field_type: "integer",
        required: false,
        secret: false,
        description: "Records requested per page",
        default: Some("50"),
    },
    ConfigField {
        name: "requests_per_second",
        field_type: "integer",
        required: false,
        secret: false,
        description: "Client-side request rate limit",
        default: Some("10"),
    },
    ConfigField {
        name: "api_url",
        field_type: "string",
        required: false,
        secret: false,
        description: "API base URL",
        default: Some(DEFAULT_API_URL),
    },
    ConfigField {
        name: "auth_url",
        field_type: "string",
        required: false,
        secret: false,
        description: "OAuth token endpoint",
        default: Some(DEFAULT_AUTH_URL),
    },
    ConfigField {
        name: "user_agent",
        field_type: "string",
        required: false,
        secret: false,
        description: "User-Agent header sent with every request",
        default: None,
    },
];

/// Settings read from `apiCredentials` before falling back to the root
const CREDENTIAL_FIELDS: &[&str] = &[
    "username",
    "password",
    "client_id",
    "client_secret",
    "account_id",
    "access_token",
    "refresh_token",
    "token_expires_at",
];

/// JSON Schema describing the accepted settings
pub fn settings_schema() -> JsonValue {
    let mut properties = JsonObject::new();
    let mut required = Vec::new();

    for field in SETTINGS {
        let mut prop = match field.field_type {
            "date-time" => json!({"type": "string", "format": "date-time"}),
            other => json!({"type": other}),
        };
        prop["description"] = json!(field.description);
        if field.secret {
            prop["secret"] = json!(true);
        }
        if let Some(default) = field.default {
            prop["default"] = match field.field_type {
                "integer" => default.parse::<i64>().map_or_else(|_| json!(default), |n| json!(n)),
                _ => json!(default),
            };
        }
        properties.insert(field.name.to_string(), prop);
        if field.required {
            required.push(field.name);
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

// ============================================================================
// Typed Config
// ============================================================================

/// Credentials and persisted tokens
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub account_id: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<i64>,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("account_id", &self.account_id)
            .field("has_access_token", &self.access_token.is_some())
            .field("token_expires_at", &self.token_expires_at)
            .finish_non_exhaustive()
    }
}

/// Validated tap configuration
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// Credentials and persisted tokens
    pub credentials: ApiCredentials,
    /// Start date normalized to RFC 3339 UTC
    pub start_date: Option<String>,
    /// Records per page
    pub page_size: u32,
    /// Request rate limit
    pub requests_per_second: u32,
    /// API base URL
    pub api_url: String,
    /// OAuth token endpoint
    pub auth_url: String,
    /// Custom User-Agent
    pub user_agent: Option<String>,
}

impl TapConfig {
    /// Build a validated config from a raw JSON document
    ///
    /// A nested `config` object is unwrapped; credential fields are read from
    /// `apiCredentials` first and from the root otherwise.
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        let root = config_root(value)
            .as_object()
            .ok_or_else(|| Error::config("config must be a JSON object"))?;
        let credentials_obj = root.get("apiCredentials").and_then(Value::as_object);

        let lookup = |key: &str| {
            let from_creds = credentials_obj
                .filter(|_| CREDENTIAL_FIELDS.contains(&key))
                .and_then(|c| c.get(key))
                .filter(|v| !v.is_null());
            from_creds.or_else(|| root.get(key).filter(|v| !v.is_null()))
        };

        let mut missing = Vec::new();
        let mut required = |key: &str| match lookup(key).and_then(string_value) {
            Some(v) => v,
            None => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let username = required("username");
        let password = required("password");
        let client_id = required("client_id");
        let client_secret = required("client_secret");

        if !missing.is_empty() {
            return Err(Error::missing_field(missing.join(", ")));
        }

        let token_expires_at = lookup("token_expires_at")
            .map(|v| {
                integer_value(v).ok_or_else(|| {
                    Error::invalid_value("token_expires_at", format!("expected a timestamp, got {v}"))
                })
            })
            .transpose()?;

        let start_date = lookup("start_date")
            .and_then(string_value)
            .map(|s| parse_start_date(&s))
            .transpose()?;

        let page_size = positive_setting(lookup("page_size"), "page_size")?
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let requests_per_second = positive_setting(lookup("requests_per_second"), "requests_per_second")?
            .unwrap_or(DEFAULT_REQUESTS_PER_SECOND);

        let url_setting = |key: &str, default: &str| -> Result<String> {
            let raw = lookup(key).and_then(string_value).unwrap_or_else(|| default.to_string());
            url::Url::parse(&raw).map_err(|e| Error::invalid_value(key, e.to_string()))?;
            Ok(raw.trim_end_matches('/').to_string())
        };

        Ok(Self {
            credentials: ApiCredentials {
                username,
                password,
                client_id,
                client_secret,
                account_id: lookup("account_id").and_then(string_value),
                access_token: lookup("access_token").and_then(string_value),
                refresh_token: lookup("refresh_token").and_then(string_value),
                token_expires_at,
            },
            start_date,
            page_size,
            requests_per_second,
            api_url: url_setting("api_url", DEFAULT_API_URL)?,
            auth_url: url_setting("auth_url", DEFAULT_AUTH_URL)?,
            user_agent: lookup("user_agent").and_then(string_value),
        })
    }

    /// Auth configuration for the authenticator
    pub fn to_auth_config(&self) -> AuthConfig {
        let creds = &self.credentials;
        AuthConfig::Oauth2Password {
            token_url: self.auth_url.clone(),
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
            username: creds.username.clone(),
            password: creds.password.clone(),
            access_token: creds.access_token.clone(),
            refresh_token: creds.refresh_token.clone(),
            token_expires_at: creds.token_expires_at,
        }
    }

    /// HTTP client configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.api_url.clone())
            .rate_limit(RateLimiterConfig::per_second(self.requests_per_second));
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }
}

fn config_root(value: &JsonValue) -> &JsonValue {
    match value.get("config") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

/// Non-empty string, numbers rendered as text
fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
        _ => None,
    }
}

fn positive_setting(value: Option<&Value>, field: &str) -> Result<Option<u32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match integer_value(value) {
        Some(n) if n > 0 => Ok(Some(u32::try_from(n).unwrap_or(u32::MAX))),
        _ => Err(Error::invalid_value(
            field,
            format!("expected a positive integer, got {value}"),
        )),
    }
}

/// Normalize a start date (RFC 3339 or `YYYY-MM-DD`) to RFC 3339 UTC
pub fn parse_start_date(raw: &str) -> Result<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true));
        }
    }
    Err(Error::invalid_value(
        "start_date",
        format!("'{raw}' is not an RFC 3339 timestamp or YYYY-MM-DD date"),
    ))
}

// ============================================================================
// Loading
// ============================================================================

/// Deep-merge `overlay` into `base`; overlay values win
pub fn merge_values(base: &mut JsonValue, overlay: JsonValue) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_values(existing, value);
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Read a single JSON file
pub fn read_json_file(path: &Path) -> Result<JsonValue> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load and merge config files in order
pub fn load_config_files(paths: &[PathBuf]) -> Result<JsonValue> {
    let mut merged = Value::Object(JsonObject::new());
    for path in paths {
        debug!("Loading config file {}", path.display());
        merge_values(&mut merged, read_json_file(path)?);
    }
    Ok(merged)
}

/// Map `TAP_OPTIPLY_*` variables to settings
///
/// Integer settings are parsed as numbers; everything else stays a string.
pub fn config_from_env<I>(vars: I) -> JsonValue
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = JsonObject::new();
    for (key, raw) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let name = name.to_lowercase();
        let is_integer = SETTINGS
            .iter()
            .any(|f| f.name == name && f.field_type == "integer");
        let value = match raw.trim().parse::<i64>() {
            Ok(n) if is_integer => json!(n),
            _ => json!(raw),
        };
        config.insert(name, value);
    }
    Value::Object(config)
}

/// Load `.env` (if present) and read the process environment
pub fn load_env_config() -> JsonValue {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => debug!("Ignoring .env file: {e}"),
    }
    config_from_env(std::env::vars())
}

// ============================================================================
// Token Persistence
// ============================================================================

/// Writes newly obtained tokens back into a config file
///
/// Tokens land under `apiCredentials` when the file has that object and at
/// the root otherwise. The file is replaced atomically.
#[derive(Debug, Clone)]
pub struct ConfigFileTokenStore {
    path: PathBuf,
}

impl ConfigFileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, token: &CachedToken) -> Result<()> {
        let mut document = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Object(JsonObject::new()),
            Err(e) => return Err(e.into()),
        };

        write_token_fields(&mut document, token)?;

        let serialized = serde_json::to_string_pretty(&document)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, serialized).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn write_token_fields(document: &mut JsonValue, token: &CachedToken) -> Result<()> {
    let Value::Object(map) = document else {
        return Err(Error::config("config file is not a JSON object"));
    };
    let root = if map.get("config").is_some_and(Value::is_object) {
        map.get_mut("config")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::config("config is not an object"))?
    } else {
        map
    };
    let target = if root.get("apiCredentials").is_some_and(Value::is_object) {
        root.get_mut("apiCredentials")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::config("apiCredentials is not an object"))?
    } else {
        root
    };

    target.insert("access_token".to_string(), json!(token.token));
    if let Some(expires_at) = token.expires_at_unix() {
        target.insert("token_expires_at".to_string(), json!(expires_at));
    }
    if let Some(refresh) = &token.refresh_token {
        target.insert("refresh_token".to_string(), json!(refresh));
    }
    Ok(())
}

#[async_trait]
impl TokenListener for ConfigFileTokenStore {
    async fn token_updated(&self, token: &CachedToken) -> Result<()> {
        self.persist(token).await?;
        info!("Saved new access token to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal() -> JsonValue {
        json!({
            "apiCredentials": {
                "username": "user@example.com",
                "password": "pw",
                "account_id": 42
            },
            "client_id": "cid",
            "client_secret": "csecret"
        })
    }

    #[test]
    fn test_credentials_from_api_credentials_and_root() {
        let config = TapConfig::from_value(&minimal()).unwrap();
        assert_eq!(config.credentials.username, "user@example.com");
        assert_eq!(config.credentials.client_id, "cid");
        assert_eq!(config.credentials.account_id.as_deref(), Some("42"));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.requests_per_second, 10);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
    }

    #[test]
    fn test_api_credentials_win_over_root() {
        let mut value = minimal();
        value["username"] = json!("root-user");
        let config = TapConfig::from_value(&value).unwrap();
        assert_eq!(config.credentials.username, "user@example.com");
    }

    #[test]
    fn test_nested_config_is_unwrapped() {
        let value = json!({"config": minimal()});
        let config = TapConfig::from_value(&value).unwrap();
        assert_eq!(config.credentials.password, "pw");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = TapConfig::from_value(&json!({"username": "u", "client_id": ""})).unwrap_err();
        match err {
            Error::MissingConfigField { field } => {
                assert_eq!(field, "password, client_id, client_secret");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            TapConfig::from_value(&json!([1, 2])),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_optional_settings() {
        let mut value = minimal();
        value["start_date"] = json!("2024-01-01");
        value["page_size"] = json!("100");
        value["requests_per_second"] = json!(5);
        value["api_url"] = json!("http://localhost:8080/v1/");
        value["apiCredentials"]["token_expires_at"] = json!(1_700_000_000.5);
        value["apiCredentials"]["access_token"] = json!("tok");

        let config = TapConfig::from_value(&value).unwrap();
        assert_eq!(config.start_date.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(config.page_size, 100);
        assert_eq!(config.requests_per_second, 5);
        assert_eq!(config.api_url, "http://localhost:8080/v1");
        assert_eq!(config.credentials.token_expires_at, Some(1_700_000_000));
        assert_eq!(config.credentials.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_invalid_settings() {
        let mut value = minimal();
        value["page_size"] = json!(0);
        assert!(matches!(
            TapConfig::from_value(&value),
            Err(Error::InvalidConfigValue { .. })
        ));

        let mut value = minimal();
        value["start_date"] = json!("yesterday");
        assert!(matches!(
            TapConfig::from_value(&value),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_parse_start_date_normalizes_offset() {
        assert_eq!(
            parse_start_date("2024-03-01T12:00:00+02:00").unwrap(),
            "2024-03-01T10:00:00Z"
        );
    }

    #[test]
    fn test_auth_config_carries_tokens() {
        let mut value = minimal();
        value["access_token"] = json!("tok");
        value["token_expires_at"] = json!(4_102_444_800_i64);
        let config = TapConfig::from_value(&value).unwrap();

        let auth = config.to_auth_config();
        let seed = auth.seed_token().unwrap();
        assert_eq!(seed.token, "tok");
        assert!(!seed.is_expired());
    }

    #[test]
    fn test_http_client_config() {
        let mut value = minimal();
        value["user_agent"] = json!("custom/1.0");
        value["requests_per_second"] = json!(3);
        let http = TapConfig::from_value(&value).unwrap().http_client_config();
        assert_eq!(http.base_url.as_deref(), Some(DEFAULT_API_URL));
        assert_eq!(http.user_agent, "custom/1.0");
        assert_eq!(http.rate_limit, Some(RateLimiterConfig::per_second(3)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = TapConfig::from_value(&minimal()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("csecret"));
        assert!(!debug.contains("\"pw\""));
    }

    #[test]
    fn test_merge_values() {
        let mut base = json!({"apiCredentials": {"username": "a", "password": "p"}, "page_size": 10});
        merge_values(
            &mut base,
            json!({"apiCredentials": {"username": "b"}, "page_size": 20}),
        );
        assert_eq!(
            base,
            json!({"apiCredentials": {"username": "b", "password": "p"}, "page_size": 20})
        );
    }

    #[test]
    fn test_load_config_files_merges_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        std::fs::write(&first, minimal().to_string()).unwrap();
        std::fs::write(&second, r#"{"page_size": 7}"#).unwrap();

        let merged = load_config_files(&[first, second]).unwrap();
        let config = TapConfig::from_value(&merged).unwrap();
        assert_eq!(config.page_size, 7);
        assert_eq!(config.credentials.client_secret, "csecret");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config_files(&[PathBuf::from("/nonexistent/config.json")]).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_config_from_env() {
        let vars = vec![
            ("TAP_OPTIPLY_USERNAME".to_string(), "envuser".to_string()),
            ("TAP_OPTIPLY_PASSWORD".to_string(), "0123".to_string()),
            ("TAP_OPTIPLY_CLIENT_ID".to_string(), "cid".to_string()),
            ("TAP_OPTIPLY_CLIENT_SECRET".to_string(), "cs".to_string()),
            ("TAP_OPTIPLY_ACCOUNT_ID".to_string(), "99".to_string()),
            ("TAP_OPTIPLY_PAGE_SIZE".to_string(), "25".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];
        let value = config_from_env(vars);
        assert_eq!(value["password"], json!("0123"));
        assert_eq!(value["page_size"], json!(25));
        assert!(value.get("home").is_none());

        let config = TapConfig::from_value(&value).unwrap();
        assert_eq!(config.credentials.username, "envuser");
        assert_eq!(config.credentials.account_id.as_deref(), Some("99"));
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_settings_schema() {
        let schema = settings_schema();
        assert_eq!(
            schema["required"],
            json!(["username", "password", "client_id", "client_secret"])
        );
        assert_eq!(schema["properties"]["password"]["secret"], json!(true));
        assert_eq!(schema["properties"]["page_size"]["default"], json!(50));
        assert_eq!(
            schema["properties"]["start_date"]["format"],
            json!("date-time")
        );
    }

    #[tokio::test]
    async fn test_token_store_writes_under_api_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, minimal().to_string()).unwrap();

        let store = ConfigFileTokenStore::new(&path);
        let token = CachedToken::expires_in("new-token".to_string(), 3600)
            .with_refresh_token(Some("refresh".to_string()));
        store.token_updated(&token).await.unwrap();

        let saved = read_json_file(&path).unwrap();
        assert_eq!(saved["apiCredentials"]["access_token"], json!("new-token"));
        assert_eq!(saved["apiCredentials"]["refresh_token"], json!("refresh"));
        assert_eq!(
            saved["apiCredentials"]["token_expires_at"],
            json!(token.expires_at_unix().unwrap())
        );
        assert_eq!(saved["client_id"], json!("cid"));
        assert!(!dir.path().join("config.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_token_store_writes_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"username": "u"}"#).unwrap();

        let store = ConfigFileTokenStore::new(&path);
        store
            .token_updated(&CachedToken::expires_in("t".to_string(), 60))
            .await
            .unwrap();

        let saved = read_json_file(&path).unwrap();
        assert_eq!(saved["access_token"], json!("t"));
        assert_eq!(saved["username"], json!("u"));
        assert!(saved.get("refresh_token").is_none());
    }
}
