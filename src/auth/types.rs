//! Auth configuration types
//!
//! These types represent the runtime auth configuration built from the
//! tap config, plus the cached token shared by every request.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// Seconds before the real expiry at which a token is treated as expired
pub const EXPIRY_BUFFER_SECS: i64 = 120;

/// Authentication configuration
#[derive(Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// OAuth2 resource owner password grant, client authenticated with HTTP Basic
    Oauth2Password {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Account username
        username: String,
        /// Account password
        password: String,
        /// Token persisted by a previous run
        access_token: Option<String>,
        /// Refresh token persisted by a previous run
        refresh_token: Option<String>,
        /// Unix timestamp (seconds) at which `access_token` expires
        token_expires_at: Option<i64>,
    },
}

impl AuthConfig {
    /// Build the cached token a previous run left behind, if it is usable
    ///
    /// A persisted token without an expiry timestamp is ignored.
    pub fn seed_token(&self) -> Option<CachedToken> {
        match self {
            AuthConfig::Oauth2Password {
                access_token: Some(token),
                refresh_token,
                token_expires_at: Some(expires_at),
                ..
            } if !token.is_empty() => {
                let expires_at = Utc.timestamp_opt(*expires_at, 0).single()?;
                Some(CachedToken {
                    token: token.clone(),
                    refresh_token: refresh_token.clone(),
                    expires_at: Some(expires_at),
                })
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::None => f.write_str("None"),
            AuthConfig::Oauth2Password {
                token_url,
                client_id,
                username,
                token_expires_at,
                ..
            } => f
                .debug_struct("Oauth2Password")
                .field("token_url", token_url)
                .field("client_id", client_id)
                .field("username", username)
                .field("token_expires_at", token_expires_at)
                .finish_non_exhaustive(),
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// Refresh token handed out together with the access token
    pub refresh_token: Option<String>,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token,
            refresh_token: None,
            expires_at,
        }
    }

    /// Create a token that expires in N seconds from now
    ///
    /// A lifetime too large to represent never expires; a hugely negative
    /// one is already expired.
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let now = Utc::now();
        let expires_at = match TimeDelta::try_seconds(seconds)
            .and_then(|delta| now.checked_add_signed(delta))
        {
            Some(at) => Some(at),
            None if seconds > 0 => None,
            None => Some(now),
        };
        Self {
            token,
            refresh_token: None,
            expires_at,
        }
    }

    /// Attach a refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    /// Check if the token is expired (with a two minute buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(EXPIRY_BUFFER_SECS);
                Utc::now() + buffer >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }

    /// Expiry as a unix timestamp in seconds
    pub fn expires_at_unix(&self) -> Option<i64> {
        self.expires_at.map(|t| t.timestamp())
    }
}
