//! `wx.config` parameters for web pages using the JS-SDK.

use std::sync::Arc;

use serde::Serialize;

use crate::crypto::jssdk_sign;
use crate::error::WechatError;
use crate::transport::Transport;
use crate::utils::{nonce_str, unix_now};

use super::WechatApi;

/// Everything a page needs to call `wx.config`, serialized with the
/// field names the JS side expects.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JssdkConfig {
    pub app_id: String,
    pub timestamp: i64,
    pub nonce_str: String,
    pub signature: String,
}

pub struct JssdkApi {
    transport: Arc<Transport>,
}

impl JssdkApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Sign `url` (the full page URL without the `#` fragment) with the
    /// cached jsapi ticket.
    pub async fn config(&self, url: &str) -> Result<JssdkConfig, WechatError> {
        let ticket = self.transport.get_ticket().await?;
        Ok(self.config_with(&ticket, url, unix_now(), nonce_str()))
    }

    fn config_with(&self, ticket: &str, url: &str, timestamp: i64, nonce: String) -> JssdkConfig {
        let url = url.split('#').next().unwrap_or(url);
        let signature = jssdk_sign(ticket, &nonce, timestamp, url);

        JssdkConfig {
            app_id: self.transport.client().appid().to_string(),
            timestamp,
            nonce_str: nonce,
            signature,
        }
    }
}

impl WechatApi for JssdkApi {
    fn transport(&self) -> &Transport {
        &self.transport
    }

    fn api_name(&self) -> &'static str {
        "jssdk"
    }
}
