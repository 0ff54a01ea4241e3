//! Unified client for one corp or account identity

use std::sync::Arc;

use crate::api::{JssdkApi, MediaApi, TagApi};
use crate::error::WechatError;
use crate::transport::Transport;

use super::{Profile, WechatBuilder};

/// Entry point of the SDK.
///
/// Owns one identity's [`Transport`] (and with it the access-token and
/// jsapi-ticket caches) and hands out endpoint wrappers sharing it. Cheap to
/// clone; clones share the caches.
///
/// # Example
///
/// ```rust,no_run
/// use wechat_sdk::client::Profile;
/// use wechat_sdk::types::{AppId, AppSecret};
/// use wechat_sdk::Wechat;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let corp = Wechat::builder()
///         .profile(Profile::Corp)
///         .appid(AppId::new("ww1234567890abcdef")?)
///         .secret(AppSecret::new("corp_secret")?)
///         .build()?;
///
///     let tag_id = corp.tags().create("ops").await?;
///     println!("created tag {}", tag_id);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Wechat {
    transport: Arc<Transport>,
}

impl From<Arc<Transport>> for Wechat {
    fn from(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

impl Wechat {
    pub fn builder() -> WechatBuilder {
        WechatBuilder::default()
    }

    pub fn appid(&self) -> &str {
        self.transport.client().appid()
    }

    pub fn profile(&self) -> Profile {
        self.transport.client().profile()
    }

    /// Shared transport, for endpoints without a typed wrapper.
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Cached access token, fetched when missing or about to expire.
    pub async fn access_token(&self) -> Result<String, WechatError> {
        self.transport.token_manager().get_token().await
    }

    /// Fetch a new access token regardless of the cached one.
    pub async fn refresh_token(&self) -> Result<String, WechatError> {
        self.transport.token_manager().refresh_token().await
    }

    pub async fn invalidate_token(&self) {
        self.transport.token_manager().invalidate().await;
    }

    pub async fn jsapi_ticket(&self) -> Result<String, WechatError> {
        self.transport.get_ticket().await
    }

    pub async fn refresh_ticket(&self) -> Result<String, WechatError> {
        self.transport.refresh_ticket().await
    }

    /// Tag management. Corp profile only; on an account client every tag
    /// call returns `WechatError::Config` without sending a request.
    pub fn tags(&self) -> TagApi {
        TagApi::new(Arc::clone(&self.transport))
    }

    pub fn media(&self) -> MediaApi {
        MediaApi::new(Arc::clone(&self.transport))
    }

    pub fn jssdk(&self) -> JssdkApi {
        JssdkApi::new(Arc::clone(&self.transport))
    }
}
