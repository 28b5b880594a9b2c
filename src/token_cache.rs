//! Bearer token cache for the Pottencial API.
//!
//! The token is obtained through a client-credentials exchange (HTTP Basic
//! auth against the token endpoint) and reused until it is within
//! [`REFRESH_MARGIN_SECS`] of its absolute expiry. Where it is kept between
//! requests is decided by a [`TokenStore`]:
//!
//! - [`CookieTokenStore`]: the token travels in two http-only cookies on the
//!   caller's browser; the handler writes them back with [`refreshed_cookies`].
//! - [`MemoryTokenStore`]: one token shared by every request of the process.

use crate::config::PottencialConfig;
use crate::errors::AuthError;
use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cookie holding the bearer token.
pub const TOKEN_COOKIE: &str = "pottencial_access_token";
/// Cookie holding the token's absolute expiry (epoch seconds).
pub const EXPIRES_COOKIE: &str = "pottencial_token_exp";

/// A token expiring within this many seconds is refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 60;
/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Opaque bearer token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Epoch seconds.
    pub expires_at: i64,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// True while the token can be used without refreshing at `now`.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        self.expires_at > now + REFRESH_MARGIN_SECS
    }
}

/// Outcome of resolving a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: AccessToken,
    /// True when a credential exchange produced `token`.
    pub refreshed: bool,
    /// Lifetime granted by the token endpoint, set only when refreshed.
    pub expires_in: Option<u64>,
}

impl TokenGrant {
    fn reused(token: AccessToken) -> Self {
        Self {
            token,
            refreshed: false,
            expires_in: None,
        }
    }
}

/// Backing store for the current token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Option<AccessToken>;
    async fn save(&self, token: &AccessToken);

    /// True when other requests read the same token. Only shared stores
    /// take the refresh lock.
    fn is_shared(&self) -> bool {
        true
    }
}

/// Process-wide store, keyed by client id.
#[derive(Clone)]
pub struct MemoryTokenStore {
    cache: Cache<String, AccessToken>,
    key: String,
}

impl MemoryTokenStore {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(16)
                .time_to_live(Duration::from_secs(24 * 3600))
                .build(),
            key: client_id.into(),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Option<AccessToken> {
        self.cache.get(&self.key).await
    }

    async fn save(&self, token: &AccessToken) {
        self.cache.insert(self.key.clone(), token.clone()).await;
    }
}

/// Read-only view of the token cookies sent with one request.
#[derive(Debug, Clone, Default)]
pub struct CookieTokenStore {
    current: Option<AccessToken>,
}

impl CookieTokenStore {
    /// Both cookies must be present and the expiry numeric, otherwise the
    /// store is empty.
    pub fn from_jar(jar: &CookieJar) -> Self {
        let current = match (jar.get(TOKEN_COOKIE), jar.get(EXPIRES_COOKIE)) {
            (Some(token), Some(expires)) if !token.value().is_empty() => expires
                .value()
                .parse::<i64>()
                .ok()
                .map(|expires_at| AccessToken::new(token.value(), expires_at)),
            _ => None,
        };
        Self { current }
    }
}

#[async_trait]
impl TokenStore for CookieTokenStore {
    async fn load(&self) -> Option<AccessToken> {
        self.current.clone()
    }

    // Persisted by the response cookies, see `refreshed_cookies`.
    async fn save(&self, _token: &AccessToken) {}

    fn is_shared(&self) -> bool {
        false
    }
}

/// Adds the two token cookies for a refreshed grant to `jar`.
///
/// Cookies are http-only, `SameSite=Strict`, scoped to `/`, `Secure` when
/// `secure` is set, and live for the token's granted lifetime.
pub fn refreshed_cookies(jar: CookieJar, grant: &TokenGrant, secure: bool) -> CookieJar {
    let max_age = time::Duration::seconds(
        grant
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS as i64),
    );

    let build = |name: &'static str, value: String| {
        Cookie::build((name, value))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(max_age)
    };

    jar.add(build(TOKEN_COOKIE, grant.token.token.clone()))
        .add(build(EXPIRES_COOKIE, grant.token.expires_at.to_string()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Resolves bearer tokens, exchanging credentials only when needed.
pub struct TokenCache {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    /// Serializes refreshes of shared stores so concurrent requests exchange once.
    refresh_lock: Mutex<()>,
}

impl TokenCache {
    pub fn new(config: &PottencialConfig, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Returns `current` unchanged while it is fresh, otherwise exchanges
    /// credentials for a new token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the token endpoint is unreachable, rejects
    /// the credentials, or answers without an `access_token`.
    pub async fn get_access_token(
        &self,
        current: Option<&AccessToken>,
    ) -> Result<TokenGrant, AuthError> {
        let now = Utc::now().timestamp();
        if let Some(token) = current.filter(|t| t.is_fresh_at(now)) {
            tracing::debug!("Reusing cached insurer token");
            return Ok(TokenGrant::reused(token.clone()));
        }
        self.exchange(now).await
    }

    /// Loads the token from `store`, refreshing and saving it when needed.
    ///
    /// # Errors
    ///
    /// See [`TokenCache::get_access_token`].
    pub async fn acquire(&self, store: &dyn TokenStore) -> Result<TokenGrant, AuthError> {
        let now = Utc::now().timestamp();
        if let Some(token) = store.load().await.filter(|t| t.is_fresh_at(now)) {
            return Ok(TokenGrant::reused(token));
        }
        if !store.is_shared() {
            return self.exchange(now).await;
        }

        let _guard = self.refresh_lock.lock().await;
        // Another request may have refreshed while we waited.
        let current = store.load().await;
        let grant = self.get_access_token(current.as_ref()).await?;
        if grant.refreshed {
            store.save(&grant.token).await;
        }
        Ok(grant)
    }

    async fn exchange(&self, now: i64) -> Result<TokenGrant, AuthError> {
        tracing::info!("Requesting new insurer access token");

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Insurer token endpoint returned {}: {}", status, body);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let token = data
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("missing access_token".to_string()))?;
        let expires_in = data.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        tracing::info!("✓ Insurer access token refreshed (expires in {}s)", expires_in);
        Ok(TokenGrant {
            token: AccessToken::new(token, now + expires_in as i64),
            refreshed: true,
            expires_in: Some(expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_margin_boundary() {
        let now = 1_700_000_000;
        assert!(!AccessToken::new("t", now + 59).is_fresh_at(now));
        assert!(!AccessToken::new("t", now + 60).is_fresh_at(now));
        assert!(AccessToken::new("t", now + 61).is_fresh_at(now));
    }

    #[test]
    fn test_cookie_store_requires_both_cookies() {
        let jar = CookieJar::new().add(Cookie::new(TOKEN_COOKIE, "abc"));
        assert!(CookieTokenStore::from_jar(&jar).current.is_none());

        let jar = jar.add(Cookie::new(EXPIRES_COOKIE, "not-a-number"));
        assert!(CookieTokenStore::from_jar(&jar).current.is_none());

        let jar = jar.add(Cookie::new(EXPIRES_COOKIE, "1700000000"));
        assert_eq!(
            CookieTokenStore::from_jar(&jar).current,
            Some(AccessToken::new("abc", 1_700_000_000))
        );
    }

    #[test]
    fn test_refreshed_cookies_attributes() {
        let grant = TokenGrant {
            token: AccessToken::new("fresh", 1_700_003_600),
            refreshed: true,
            expires_in: Some(3600),
        };
        let jar = refreshed_cookies(CookieJar::new(), &grant, true);

        let token = jar.get(TOKEN_COOKIE).unwrap();
        assert_eq!(token.value(), "fresh");
        assert_eq!(token.http_only(), Some(true));
        assert_eq!(token.secure(), Some(true));
        assert_eq!(token.same_site(), Some(SameSite::Strict));
        assert_eq!(token.path(), Some("/"));
        assert_eq!(token.max_age(), Some(time::Duration::seconds(3600)));

        let expires = jar.get(EXPIRES_COOKIE).unwrap();
        assert_eq!(expires.value(), "1700003600");
    }

    #[test]
    fn test_only_memory_store_is_shared() {
        assert!(MemoryTokenStore::new("client").is_shared());
        assert!(!CookieTokenStore::default().is_shared());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new("client");
        assert!(store.load().await.is_none());

        store.save(&AccessToken::new("abc", 42)).await;
        assert_eq!(store.load().await, Some(AccessToken::new("abc", 42)));
    }
}
