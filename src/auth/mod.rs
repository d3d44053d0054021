//! Authentication module
//!
//! Optiply uses the OAuth2 password grant: the client id and secret travel
//! as HTTP Basic credentials, the account username and password in the form
//! body. The `Authenticator` caches the bearer token for the whole process and
//! refreshes it shortly before it expires.

mod authenticator;
mod types;

pub use authenticator::{basic_auth_header, Authenticator, TokenListener};
pub use types::{AuthConfig, CachedToken, EXPIRY_BUFFER_SECS};
