//! Authenticator implementation
//!
//! Handles applying authentication to requests and managing token refresh.

use super::types::{AuthConfig, CachedToken};
use crate::error::{is_retryable_status, Error, Result};
use crate::types::RetryPolicy;
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Receives every token the authenticator obtains from the token endpoint
#[async_trait]
pub trait TokenListener: Send + Sync {
    /// Called after a new token has been cached
    async fn token_updated(&self, token: &CachedToken) -> Result<()>;
}

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached token shared by every request of the process
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for token requests
    http_client: Client,
    /// Notified when a fresh token is obtained
    listener: Option<Arc<dyn TokenListener>>,
    /// Retries for transient token endpoint failures
    retry: RetryPolicy,
}

/// Timeout for a single token request
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        let client = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(config, client)
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        let seed = config.seed_token();
        Self {
            config,
            cached_token: Arc::new(RwLock::new(seed)),
            http_client,
            listener: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Use the given retry policy for token requests
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Register a listener for newly obtained tokens
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TokenListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),
            AuthConfig::Oauth2Password { .. } => {
                let token = self.token().await?;
                Ok(req.bearer_auth(token))
            }
        }
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        // Need to refresh - acquire write lock
        let mut cached = self.cached_token.write().await;

        // Double-check after acquiring write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let previous_refresh = cached.as_ref().and_then(|t| t.refresh_token.clone());
        let new_token = self.fetch_new_token(previous_refresh).await?;
        let token_str = new_token.token.clone();

        if let Some(listener) = &self.listener {
            if let Err(e) = listener.token_updated(&new_token).await {
                warn!("Failed to persist new access token: {e}");
            }
        }

        *cached = Some(new_token);
        Ok(token_str)
    }

    /// Fetch a new token, preferring the refresh grant when a refresh token is known
    async fn fetch_new_token(&self, previous_refresh: Option<String>) -> Result<CachedToken> {
        let AuthConfig::Oauth2Password {
            token_url,
            client_id,
            client_secret,
            username,
            password,
            refresh_token,
            ..
        } = &self.config
        else {
            return Err(Error::auth(
                "Token refresh not supported for this auth type",
            ));
        };

        let refresh_token = previous_refresh.or_else(|| refresh_token.clone());
        if let Some(refresh) = refresh_token.as_deref().filter(|r| !r.is_empty()) {
            info!("Attempting to refresh access token...");
            let form = [("grant_type", "refresh_token"), ("refresh_token", refresh)];
            match self
                .request_token(token_url, client_id, client_secret, &form)
                .await
            {
                Ok(token) => {
                    // Some servers omit the refresh token on refresh; keep the old one
                    let keep = token.refresh_token.clone().or(Some(refresh.to_string()));
                    return Ok(token.with_refresh_token(keep));
                }
                Err(e) => {
                    warn!("Token refresh failed, falling back to password grant: {e}");
                }
            }
        }

        info!("Attempting to get access token...");
        let form = [
            ("grant_type", "password"),
            ("username", username.as_str()),
            ("password", password.as_str()),
        ];
        self.request_token(token_url, client_id, client_secret, &form)
            .await
    }

    /// POST a form to the token endpoint, retrying transient failures
    async fn request_token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        form: &[(&str, &str)],
    ) -> Result<CachedToken> {
        let grant = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map_or("unknown", |(_, v)| *v);

        let mut attempt = 0;
        let result = loop {
            match self
                .try_request_token(token_url, client_id, client_secret, form)
                .await
            {
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "Token request attempt {}/{} failed: {e}. Retrying in {:?}",
                        attempt + 1,
                        self.retry.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => break other,
            }
        };

        result.map_err(|e| {
            let message = match e {
                Error::HttpStatus { status, body } => {
                    format!("Token request failed with status {status}: {body}")
                }
                Error::Auth { message } => message,
                other => format!("Token request failed: {other}"),
            };
            if grant == "refresh_token" {
                Error::TokenRefresh { message }
            } else {
                Error::Auth { message }
            }
        })
    }

    /// Single token request
    ///
    /// Retryable statuses come back as `Error::HttpStatus`.
    async fn try_request_token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        form: &[(&str, &str)],
    ) -> Result<CachedToken> {
        let response = self
            .http_client
            .post(token_url)
            .header(AUTHORIZATION, basic_auth_header(client_id, client_secret))
            .header(ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if is_retryable_status(status) {
                Error::http_status(status, body)
            } else {
                Error::auth(format!("Token request failed with status {status}: {body}"))
            });
        }

        let body = response.text().await.map_err(Error::Http)?;
        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::auth(format!("Invalid token response: {e}")))?;
        info!("OAuth authorization attempt was successful.");
        debug!(
            "Got access token: {}... (type {:?}, scope {:?})",
            token_prefix(&token_response.access_token),
            token_response.token_type,
            token_response.scope
        );
        Ok(token_response.into_cached_token())
    }

    /// Clear the cached token so the next request fetches a new one
    pub async fn invalidate(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Snapshot of the cached token
    pub async fn cached(&self) -> Option<CachedToken> {
        self.cached_token.read().await.clone()
    }

    /// Whether requests carry a token at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self.config, AuthConfig::None)
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        let token = match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        };
        token.with_refresh_token(self.refresh_token)
    }
}

/// Build the `Basic` authorization value for the OAuth client
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{client_id}:{client_secret}"));
    format!("Basic {encoded}")
}

fn token_prefix(token: &str) -> &str {
    token.get(..10).unwrap_or(token)
}
