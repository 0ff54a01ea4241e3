//! WeChat HTTP Client
//!
//! Provides the HTTP client wrapper shared by the credential cache and the
//! transport.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

use crate::error::WechatError;
use crate::types::{AppId, AppSecret};

use super::Profile;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Everything except RFC 3986 unreserved characters, like a query-escape.
const CREDENTIAL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const CREDENTIAL_PARAM: &str = "access_token";

type MiddlewareFuture =
    Pin<Box<dyn Future<Output = Result<reqwest::Response, reqwest::Error>> + Send>>;
pub(crate) type MiddlewareExecutor =
    Arc<dyn Fn(reqwest::Request) -> MiddlewareFuture + Send + Sync>;

/// WeChat API Client
///
/// Holds the HTTP connection pool, the client identity and the integration
/// profile. Cheap to clone.
#[derive(Clone)]
pub struct WechatClient {
    http: Client,
    profile: Profile,
    appid: AppId,
    secret: AppSecret,
    base_url: String,
    middleware_executor: Option<MiddlewareExecutor>,
}

impl std::fmt::Debug for WechatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatClient")
            .field("profile", &self.profile)
            .field("appid", &self.appid)
            .field("base_url", &self.base_url)
            .field(
                "middleware_executor",
                &self.middleware_executor.as_ref().map(|_| ".."),
            )
            .finish_non_exhaustive()
    }
}

impl WechatClient {
    /// Create a new client builder
    pub fn builder() -> WechatClientBuilder {
        WechatClientBuilder::default()
    }

    pub fn appid(&self) -> &str {
        self.appid.as_str()
    }

    pub(crate) fn secret(&self) -> &str {
        self.secret.as_str()
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying [`reqwest::Client`] for raw HTTP requests.
    ///
    /// Note: requests made through this client bypass the middleware pipeline.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn with_middleware_executor(mut self, executor: MiddlewareExecutor) -> Self {
        self.middleware_executor = Some(executor);
        self
    }

    /// Absolute URLs pass through; paths are joined onto the base URL.
    pub(crate) fn resolve_url(&self, template: &str) -> String {
        if template.starts_with("http://") || template.starts_with("https://") {
            template.to_string()
        } else {
            format!("{}{}", self.base_url, template)
        }
    }

    /// Complete a URL template with a credential value.
    ///
    /// A template ending in `=` is missing only the credential value, which is
    /// appended percent-encoded. Any other template gets an `access_token`
    /// parameter added.
    pub(crate) fn append_credential(template: &str, credential: &str) -> String {
        let encoded = encode_query_value(credential);

        if template.ends_with('=') {
            return format!("{template}{encoded}");
        }

        let separator = if template.contains('?') { '&' } else { '?' };
        format!("{template}{separator}{CREDENTIAL_PARAM}={encoded}")
    }

    pub(crate) async fn send_request(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, reqwest::Error> {
        if let Some(executor) = &self.middleware_executor {
            (executor)(request).await
        } else {
            self.http.execute(request).await
        }
    }

    /// Send and check the HTTP status. Anything other than 200 is an error.
    pub(crate) async fn send_checked(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, WechatError> {
        let response = self.send_request(request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WechatError::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<T, WechatError> {
        let response = self.send_checked(request).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(|e| WechatError::Decode(e.to_string()))
    }

    /// Make an unauthenticated GET request to the WeChat API
    ///
    /// # Arguments
    /// * `path` - API endpoint path (e.g., "/cgi-bin/token")
    /// * `query` - Query parameters as key-value pairs
    ///
    /// # Errors
    /// - `WechatError::Transport` when the request cannot be sent
    /// - `WechatError::HttpStatus` for a non-200 response
    /// - `WechatError::Decode` for a malformed body
    ///
    /// The status code embedded in the body is not inspected here.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WechatError> {
        let url = self.resolve_url(path);
        let request = self.http.get(url).query(query).build()?;
        self.execute_json(request).await
    }
}

impl Service<reqwest::Request> for WechatClient {
    type Response = reqwest::Response;
    type Error = reqwest::Error;
    type Future = MiddlewareFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: reqwest::Request) -> Self::Future {
        let client = self.http.clone();
        Box::pin(async move { client.execute(req).await })
    }
}

/// Builder for WechatClient
///
/// # Example
///
/// ```rust
/// use wechat_sdk::client::{Profile, WechatClient};
/// use wechat_sdk::types::{AppId, AppSecret};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = WechatClient::builder()
///         .profile(Profile::Corp)
///         .appid(AppId::new("ww1234567890abcdef")?)
///         .secret(AppSecret::new("corp_secret")?)
///         .build()?;
///
///     assert_eq!(client.base_url(), "https://qyapi.weixin.qq.com");
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct WechatClientBuilder {
    profile: Profile,
    appid: Option<AppId>,
    secret: Option<AppSecret>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl WechatClientBuilder {
    /// Default: [`Profile::Account`]
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn appid(mut self, appid: AppId) -> Self {
        self.appid = Some(appid);
        self
    }

    pub fn secret(mut self, secret: AppSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Set the base URL for API calls
    ///
    /// Default: the profile's host
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the total timeout for requests
    ///
    /// Default: 30 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the WechatClient
    ///
    /// # Errors
    /// Returns `WechatError::Config` if appid or secret is not set, or if the
    /// base URL is not http/https.
    pub fn build(self) -> Result<WechatClient, WechatError> {
        let appid = self
            .appid
            .ok_or_else(|| WechatError::Config("appid is required".to_string()))?;
        let secret = self
            .secret
            .ok_or_else(|| WechatError::Config("secret is required".to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| self.profile.default_base_url().to_string());
        let base_url = validate_base_url(base_url)?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let connect_timeout = self
            .connect_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(WechatClient {
            http: client,
            profile: self.profile,
            appid,
            secret,
            base_url,
            middleware_executor: None,
        })
    }
}

/// Percent-encode a single query value.
pub(crate) fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, CREDENTIAL_ENCODE_SET).to_string()
}

pub(crate) fn validate_base_url(base_url: String) -> Result<String, WechatError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(WechatError::Config(format!(
            "base_url must start with http:// or https://, got: {}",
            base_url
        )));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}
