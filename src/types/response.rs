//! Status-code envelope shared by every JSON response.

use serde::{Deserialize, Serialize};

use crate::error::WechatError;

/// `errcode` for a successful call.
pub const ERRCODE_OK: i32 = 0;
/// `errcode` for an invalid or revoked access token.
pub const ERRCODE_INVALID_CREDENTIAL: i32 = 40001;
/// `errcode` for an access token past its lifetime.
pub const ERRCODE_TIMEOUT: i32 = 42001;

/// How the transport treats a decoded status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    /// The credential is stale; refresh it and repeat the call once.
    RefreshAndRetry,
    Failed,
}

impl StatusClass {
    pub fn of(errcode: i32) -> Self {
        match errcode {
            ERRCODE_OK => StatusClass::Ok,
            ERRCODE_TIMEOUT | ERRCODE_INVALID_CREDENTIAL => StatusClass::RefreshAndRetry,
            _ => StatusClass::Failed,
        }
    }
}

pub(crate) fn is_credential_status(errcode: i32) -> bool {
    StatusClass::of(errcode) == StatusClass::RefreshAndRetry
}

/// Response types that carry the `errcode` / `errmsg` envelope.
///
/// The transport reads the status code through this trait to decide whether
/// a call succeeded, failed, or must be retried with a fresh credential.
///
/// # Example
///
/// ```rust
/// use wechat_sdk::types::WechatApiResponse;
///
/// #[derive(serde::Deserialize)]
/// struct TagCreated {
///     #[serde(default)]
///     tagid: i64,
///     #[serde(default)]
///     errcode: i32,
///     #[serde(default)]
///     errmsg: String,
/// }
///
/// impl WechatApiResponse for TagCreated {
///     fn errcode(&self) -> i32 { self.errcode }
///     fn errmsg(&self) -> &str { &self.errmsg }
/// }
///
/// let resp: TagCreated = serde_json::from_str(r#"{"errcode":0,"errmsg":"created","tagid":7}"#).unwrap();
/// assert!(resp.check().is_ok());
/// assert_eq!(resp.tagid, 7);
/// ```
pub trait WechatApiResponse {
    /// `0` indicates success; any other value is an error.
    fn errcode(&self) -> i32;

    fn errmsg(&self) -> &str;

    /// Returns `WechatError::Api` when `errcode != 0`.
    fn check(&self) -> Result<(), WechatError> {
        WechatError::check_api(self.errcode(), self.errmsg())
    }

    fn is_success(&self) -> bool {
        self.errcode() == ERRCODE_OK
    }
}

/// Response carrying only `errcode` and `errmsg`.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiResponseBase {
    #[serde(default)]
    pub errcode: i32,
    #[serde(default)]
    pub errmsg: String,
}

impl ApiResponseBase {
    pub fn success() -> Self {
        Self {
            errcode: ERRCODE_OK,
            errmsg: "ok".to_string(),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            errcode: code,
            errmsg: message.into(),
        }
    }
}

impl WechatApiResponse for ApiResponseBase {
    fn errcode(&self) -> i32 {
        self.errcode
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::of(0), StatusClass::Ok);
        assert_eq!(StatusClass::of(40001), StatusClass::RefreshAndRetry);
        assert_eq!(StatusClass::of(42001), StatusClass::RefreshAndRetry);
        assert_eq!(StatusClass::of(-1), StatusClass::Failed);
        assert_eq!(StatusClass::of(40014), StatusClass::Failed);
    }

    #[test]
    fn test_base_defaults_when_fields_missing() {
        let resp: ApiResponseBase = serde_json::from_str("{}").unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.errmsg, "");
    }

    #[test]
    fn test_base_error() {
        let resp: ApiResponseBase =
            serde_json::from_str(r#"{"errcode":40013,"errmsg":"invalid appid"}"#).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp, ApiResponseBase::error(40013, "invalid appid"));
        assert!(resp.check().is_err());
    }
}
