//! Credential management for WeChat API
//!
//! Caches the access token (and, through [`CredentialSlot`], the jsapi
//! ticket), refreshes lazily when a credential is expired or about to expire,
//! and collapses concurrent refreshes into a single issuance call.

use std::future::Future;

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::client::WechatClient;
use crate::error::WechatError;
use crate::types::WechatApiResponse;
use crate::utils::unix_now;

/// A credential closer than this to its expiry is treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 2;

/// Subtract a safety buffer from a server-advertised lifetime.
///
/// | lifetime (s) | buffer (s) |
/// |---|---|
/// | > 3600 | 600 |
/// | > 1800 | 300 |
/// | > 300 | 60 |
/// | > 60 | 10 |
/// | > 0 | 0 |
///
/// # Errors
/// `WechatError::InvalidLifetime` when `lifetime <= 0`.
pub fn buffered_lifetime(lifetime: i64) -> Result<i64, WechatError> {
    let buffer = match lifetime {
        l if l > 60 * 60 => 60 * 10,
        l if l > 60 * 30 => 60 * 5,
        l if l > 60 * 5 => 60,
        l if l > 60 => 10,
        l if l > 0 => 0,
        l => return Err(WechatError::InvalidLifetime(l)),
    };
    Ok(lifetime - buffer)
}

/// A bearer secret with an absolute expiry (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    expires_at: i64,
}

impl Credential {
    pub fn new(value: impl Into<String>, expires_at: i64) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Build from an advertised lifetime, applying [`buffered_lifetime`].
    pub fn from_lifetime(
        value: impl Into<String>,
        lifetime: i64,
        now: i64,
    ) -> Result<Self, WechatError> {
        let lifetime = buffered_lifetime(lifetime)?;
        Ok(Self::new(value, now + lifetime))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.value.is_empty() && now + EXPIRY_MARGIN_SECS < self.expires_at
    }
}

/// Single cached credential guarded by an async mutex.
///
/// The validity check and the refresh both run under the lock, so callers
/// that race on an expired credential wait for one issuance call instead of
/// each making their own.
#[derive(Debug, Default)]
pub struct CredentialSlot {
    state: Mutex<Option<Credential>>,
}

impl CredentialSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value if still valid, otherwise the result of `fetch`.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<String, WechatError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Credential, WechatError>>,
    {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if cached.is_valid() {
                return Ok(cached.value.clone());
            }
        }

        Self::store(&mut state, fetch().await?)
    }

    /// Unconditionally fetch and store a new credential.
    pub async fn refresh<F, Fut>(&self, fetch: F) -> Result<String, WechatError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Credential, WechatError>>,
    {
        let mut state = self.state.lock().await;
        Self::store(&mut state, fetch().await?)
    }

    /// Replace a credential the server rejected.
    ///
    /// If another caller already swapped `failed` for a newer valid value,
    /// that value is returned without another issuance call. `failed` itself
    /// is never handed back.
    pub async fn refresh_after<F, Fut>(&self, failed: &str, fetch: F) -> Result<String, WechatError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Credential, WechatError>>,
    {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if cached.value != failed && cached.is_valid() {
                return Ok(cached.value.clone());
            }
        }

        Self::store(&mut state, fetch().await?)
    }

    pub async fn set(&self, credential: Credential) {
        *self.state.lock().await = Some(credential);
    }

    pub async fn snapshot(&self) -> Option<Credential> {
        self.state.lock().await.clone()
    }

    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    fn store(state: &mut Option<Credential>, credential: Credential) -> Result<String, WechatError> {
        let value = credential.value.clone();
        *state = Some(credential);
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) expires_in: i64,
    #[serde(default)]
    pub(crate) errcode: i32,
    #[serde(default)]
    pub(crate) errmsg: String,
}

impl WechatApiResponse for TokenResponse {
    fn errcode(&self) -> i32 {
        self.errcode
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}

/// Manages the access_token lifecycle with automatic refresh
#[derive(Debug)]
pub struct TokenManager {
    client: WechatClient,
    slot: CredentialSlot,
}

impl TokenManager {
    pub fn new(client: WechatClient) -> Self {
        Self {
            client,
            slot: CredentialSlot::new(),
        }
    }

    pub fn client(&self) -> &WechatClient {
        &self.client
    }

    /// Cached access token, refreshed first when missing or near expiry.
    pub async fn get_token(&self) -> Result<String, WechatError> {
        self.slot.get_or_refresh(|| self.fetch_token()).await
    }

    /// Fetch a new access token regardless of the cached one.
    pub async fn refresh_token(&self) -> Result<String, WechatError> {
        self.slot.refresh(|| self.fetch_token()).await
    }

    /// Replace a token the server rejected; see [`CredentialSlot::refresh_after`].
    pub async fn refresh_token_after(&self, failed: &str) -> Result<String, WechatError> {
        self.slot.refresh_after(failed, || self.fetch_token()).await
    }

    /// Install a token obtained elsewhere, e.g. restored by the caller.
    pub async fn set_token(&self, credential: Credential) {
        self.slot.set(credential).await;
    }

    pub async fn token_info(&self) -> Option<Credential> {
        self.slot.snapshot().await
    }

    pub async fn invalidate(&self) {
        self.slot.invalidate().await;
    }

    async fn fetch_token(&self) -> Result<Credential, WechatError> {
        log::debug!(
            "refreshing {} access_token for {}",
            self.client.profile().as_str(),
            self.client.appid()
        );

        self.request_token()
            .await
            .map_err(WechatError::credential_fetch)
    }

    async fn request_token(&self) -> Result<Credential, WechatError> {
        let profile = self.client.profile();
        let query = profile.token_query(self.client.appid(), self.client.secret());

        let response: TokenResponse = self.client.get(profile.token_path(), &query).await?;
        response.check()?;

        if response.access_token.is_empty() {
            return Err(WechatError::Decode(
                "credential response has no access_token".to_string(),
            ));
        }

        Credential::from_lifetime(response.access_token, response.expires_in, unix_now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppId, AppSecret};

    fn create_test_client() -> WechatClient {
        WechatClient::builder()
            .appid(AppId::new("wx1234567890abcdef").unwrap())
            .secret(AppSecret::new("secret1234567890ab").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_buffered_lifetime_brackets() {
        assert_eq!(buffered_lifetime(7200).unwrap(), 6600);
        assert_eq!(buffered_lifetime(3601).unwrap(), 3001);
        assert_eq!(buffered_lifetime(3600).unwrap(), 3300);
        assert_eq!(buffered_lifetime(1801).unwrap(), 1501);
        assert_eq!(buffered_lifetime(1800).unwrap(), 1740);
        assert_eq!(buffered_lifetime(301).unwrap(), 241);
        assert_eq!(buffered_lifetime(300).unwrap(), 290);
        assert_eq!(buffered_lifetime(61).unwrap(), 51);
        assert_eq!(buffered_lifetime(60).unwrap(), 60);
        assert_eq!(buffered_lifetime(1).unwrap(), 1);
    }

    #[test]
    fn test_buffered_lifetime_rejects_non_positive() {
        assert!(matches!(
            buffered_lifetime(0),
            Err(WechatError::InvalidLifetime(0))
        ));
        assert!(matches!(
            buffered_lifetime(-5),
            Err(WechatError::InvalidLifetime(-5))
        ));
    }

    #[test]
    fn test_from_lifetime_stores_absolute_expiry() {
        let now = 1_700_000_000;
        let credential = Credential::from_lifetime("tok", 7200, now).unwrap();
        assert_eq!(credential.expires_at(), now + 7200 - 600);
    }

    #[test]
    fn test_validity_margin() {
        let now = 1_700_000_000;
        assert!(!Credential::new("tok", now + 1).is_valid_at(now));
        assert!(!Credential::new("tok", now + 2).is_valid_at(now));
        assert!(Credential::new("tok", now + 3).is_valid_at(now));
    }

    #[test]
    fn test_empty_value_is_never_valid() {
        let now = 1_700_000_000;
        assert!(!Credential::new("", now + 7200).is_valid_at(now));
    }

    #[tokio::test]
    async fn test_slot_returns_cached_without_fetching() {
        let slot = CredentialSlot::new();
        slot.set(Credential::new("cached", unix_now() + 600)).await;

        let value = slot
            .get_or_refresh(|| async { Err(WechatError::Config("fetch must not run".into())) })
            .await
            .unwrap();
        assert_eq!(value, "cached");
    }

    #[tokio::test]
    async fn test_slot_refreshes_expired() {
        let slot = CredentialSlot::new();
        slot.set(Credential::new("old", unix_now() + 1)).await;

        let value = slot
            .get_or_refresh(|| async { Ok(Credential::new("new", unix_now() + 600)) })
            .await
            .unwrap();
        assert_eq!(value, "new");
        assert_eq!(slot.snapshot().await.unwrap().value(), "new");
    }

    #[tokio::test]
    async fn test_refresh_after_skips_fetch_when_already_rotated() {
        let slot = CredentialSlot::new();
        slot.set(Credential::new("rotated", unix_now() + 600)).await;

        let value = slot
            .refresh_after("stale", || async { Err(WechatError::Config("already rotated".into())) })
            .await
            .unwrap();
        assert_eq!(value, "rotated");
    }

    #[tokio::test]
    async fn test_refresh_after_never_reuses_failed_value() {
        let slot = CredentialSlot::new();
        slot.set(Credential::new("stale", unix_now() + 600)).await;

        let value = slot
            .refresh_after("stale", || async { Ok(Credential::new("fresh", unix_now() + 600)) })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_state() {
        let slot = CredentialSlot::new();
        let result = slot
            .refresh(|| async { Err(WechatError::InvalidLifetime(0)) })
            .await;

        assert!(result.is_err());
        assert!(slot.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let manager = TokenManager::new(create_test_client());
        manager
            .set_token(Credential::new("test", unix_now() + 7200))
            .await;
        assert!(manager.token_info().await.is_some());

        manager.invalidate().await;

        assert!(manager.token_info().await.is_none());
    }

    #[test]
    fn test_token_response_defaults() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"errcode":40013,"errmsg":"invalid appid"}"#).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.access_token, "");
        assert_eq!(response.expires_in, 0);
    }
}
