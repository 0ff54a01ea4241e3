use thiserror::Error;

/// WeChat SDK error types
#[derive(Debug, Error)]
pub enum WechatError {
    /// Network or connection failure. Never retried by the transport.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16 },

    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The credential issuance call failed; the in-flight request is aborted.
    #[error("failed to fetch credential: {0}")]
    CredentialFetch(#[source] Box<WechatError>),

    #[error("invalid expires_in: {0}")]
    InvalidLifetime(i64),

    /// Decoded response carrying a non-success status code.
    #[error("WeChat API error (code={code}): {message}")]
    Api { code: i32, message: String },

    /// Payment protocol failure (`return_code` other than `SUCCESS`).
    #[error("WeChat Pay error (return_code={code}): {message}")]
    Pay { code: String, message: String },

    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl WechatError {
    /// Map a status code/message pair to `Ok(())` or [`WechatError::Api`].
    pub fn check_api(code: i32, message: &str) -> Result<(), WechatError> {
        if code == 0 {
            Ok(())
        } else {
            Err(WechatError::Api {
                code,
                message: message.to_string(),
            })
        }
    }

    /// Remote status code of a business error, looking through
    /// [`WechatError::CredentialFetch`].
    pub fn api_code(&self) -> Option<i32> {
        match self {
            WechatError::Api { code, .. } => Some(*code),
            WechatError::CredentialFetch(source) => source.api_code(),
            _ => None,
        }
    }

    /// True when the remote side reported an expired or invalid credential.
    pub fn is_credential_error(&self) -> bool {
        self.api_code()
            .map(crate::types::response::is_credential_status)
            .unwrap_or(false)
    }

    pub(crate) fn credential_fetch(source: WechatError) -> Self {
        match source {
            already @ WechatError::CredentialFetch(_) => already,
            other => WechatError::CredentialFetch(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_api() {
        assert!(WechatError::check_api(0, "ok").is_ok());

        let err = WechatError::check_api(40013, "invalid appid").unwrap_err();
        assert_eq!(err.api_code(), Some(40013));
        assert_eq!(
            err.to_string(),
            "WeChat API error (code=40013): invalid appid"
        );
    }

    #[test]
    fn test_credential_fetch_is_not_nested() {
        let inner = WechatError::credential_fetch(WechatError::InvalidLifetime(0));
        let outer = WechatError::credential_fetch(inner);

        match outer {
            WechatError::CredentialFetch(source) => {
                assert!(matches!(*source, WechatError::InvalidLifetime(0)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_is_credential_error() {
        let expired = WechatError::Api {
            code: 42001,
            message: "access_token expired".to_string(),
        };
        assert!(expired.is_credential_error());

        let fetch = WechatError::credential_fetch(WechatError::Api {
            code: 40001,
            message: "invalid credential".to_string(),
        });
        assert!(fetch.is_credential_error());

        assert!(!WechatError::HttpStatus { status: 500 }.is_credential_error());
    }
}
