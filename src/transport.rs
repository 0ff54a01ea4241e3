//! Authenticated request/response cycle with one-shot credential retry.
//!
//! Every call fetches the access token from the cache, appends it to the URL
//! template, sends the request and decodes the JSON body. When the decoded
//! status code says the token expired or was rejected, the token is refreshed
//! and the whole request is repeated exactly once.
//!
//! ```text
//! FETCH_CREDENTIAL -> SEND
//! SEND --(HTTP != 200)------------------------------> HttpStatus
//! SEND --(malformed body)---------------------------> Decode
//! SEND --(errcode 0)--------------------------------> Ok
//! SEND --(40001 | 42001, first attempt)-------------> REFRESH -> SEND
//! SEND --(any other code, or retry already spent)---> Api
//! ```

use std::sync::Arc;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::WechatClient;
use crate::error::WechatError;
use crate::token::{Credential, CredentialSlot, TokenManager};
use crate::types::{ApiResponseBase, StatusClass, WechatApiResponse};
use crate::utils::unix_now;

/// Extra attempts allowed after a credential status code.
const MAX_CREDENTIAL_RETRIES: u32 = 1;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A file plus optional JSON side field, sent as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    field_name: String,
    file_name: String,
    data: Vec<u8>,
    mime: Option<String>,
    extra: Option<(String, String)>,
}

impl MultipartUpload {
    /// `field_name` is the form field carrying the file (usually `media`).
    pub fn new(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            data: data.into(),
            mime: None,
            extra: None,
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Attach a JSON-encoded text field next to the file, e.g. the
    /// `description` of a video upload.
    pub fn json_field<V: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &V,
    ) -> Result<Self, WechatError> {
        let encoded = serde_json::to_string(value)?;
        self.extra = Some((name.into(), encoded));
        Ok(self)
    }

    fn form(&self) -> Result<Form, reqwest::Error> {
        let mut part = Part::bytes(self.data.clone()).file_name(self.file_name.clone());
        if let Some(mime) = &self.mime {
            part = part.mime_str(mime)?;
        }

        let mut form = Form::new().part(self.field_name.clone(), part);
        if let Some((name, value)) = &self.extra {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

/// Serialize a request body.
///
/// `serde_json` writes `<`, `>` and `&` as literal characters (it never
/// applies HTML escaping), which the remote server requires.
pub(crate) fn encode_json<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, WechatError> {
    Ok(serde_json::to_vec(body)?)
}

/// `text/plain` and `application/json` bodies on a media endpoint are error
/// envelopes; everything else is the media stream itself.
fn is_error_envelope(headers: &HeaderMap) -> bool {
    let media_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    media_type == "text/plain" || media_type == "application/json"
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    #[serde(default)]
    ticket: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

impl WechatApiResponse for TicketResponse {
    fn errcode(&self) -> i32 {
        self.errcode
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}

/// Shared request pipeline for every authenticated endpoint.
///
/// Owns the token manager and the jsapi ticket slot of one client identity.
pub struct Transport {
    client: Arc<WechatClient>,
    token_manager: Arc<TokenManager>,
    ticket: CredentialSlot,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("client", &self.client)
            .field("token_manager", &"TokenManager { .. }")
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(client: Arc<WechatClient>, token_manager: Arc<TokenManager>) -> Self {
        Self {
            client,
            token_manager,
            ticket: CredentialSlot::new(),
        }
    }

    pub fn client(&self) -> &WechatClient {
        &self.client
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    /// GET `url_template` + token and decode the response.
    ///
    /// # Errors
    /// - `WechatError::CredentialFetch` when no token can be obtained
    /// - `WechatError::Transport`, `HttpStatus`, `Decode` as sent/received
    /// - `WechatError::Api` for a non-zero `errcode`
    pub async fn get_json<T>(&self, url_template: &str) -> Result<T, WechatError>
    where
        T: DeserializeOwned + WechatApiResponse,
    {
        let response: T = self.get_json_raw(url_template).await?;
        response.check()?;
        Ok(response)
    }

    /// Like [`get_json`](Self::get_json) but returns the decoded response
    /// whatever its `errcode`, for endpoints with non-fatal codes.
    pub async fn get_json_raw<T>(&self, url_template: &str) -> Result<T, WechatError>
    where
        T: DeserializeOwned + WechatApiResponse,
    {
        let http = self.client.http();
        self.call(url_template, |url| http.get(url).build()).await
    }

    /// POST `body` as JSON to `url_template` + token and decode the response.
    ///
    /// # Errors
    /// Same as [`get_json`](Self::get_json), plus `WechatError::Json` when the
    /// body cannot be serialized.
    pub async fn post_json<B, T>(&self, url_template: &str, body: &B) -> Result<T, WechatError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + WechatApiResponse,
    {
        let response: T = self.post_json_raw(url_template, body).await?;
        response.check()?;
        Ok(response)
    }

    pub async fn post_json_raw<B, T>(&self, url_template: &str, body: &B) -> Result<T, WechatError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + WechatApiResponse,
    {
        let payload = encode_json(body)?;
        let http = self.client.http();

        self.call(url_template, |url| {
            http.post(url)
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(payload.clone())
                .build()
        })
        .await
    }

    /// Upload a file as `multipart/form-data`. The form is rebuilt for the
    /// retry attempt.
    pub async fn upload_multipart<T>(
        &self,
        url_template: &str,
        upload: &MultipartUpload,
    ) -> Result<T, WechatError>
    where
        T: DeserializeOwned + WechatApiResponse,
    {
        let http = self.client.http();
        let response: T = self
            .call(url_template, |url| http.post(url).multipart(upload.form()?).build())
            .await?;
        response.check()?;
        Ok(response)
    }

    /// Stream a media download into `sink`, returning the number of bytes
    /// written.
    ///
    /// A `text/plain` or `application/json` response is decoded as an error
    /// envelope and follows the usual retry policy; any other content type is
    /// copied to `sink` chunk by chunk.
    pub async fn download_to<W>(&self, url_template: &str, sink: &mut W) -> Result<u64, WechatError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut token = self.token_manager.get_token().await?;
        let mut attempt = 0;

        loop {
            let url = self.finish_url(url_template, &token);
            let request = self.client.http().get(url).build()?;
            let mut response = self.client.send_checked(request).await?;

            if !is_error_envelope(response.headers()) {
                let mut written = 0u64;
                while let Some(chunk) = response.chunk().await? {
                    sink.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                sink.flush().await?;
                return Ok(written);
            }

            let body = response.bytes().await?;
            let envelope: ApiResponseBase =
                serde_json::from_slice(&body).map_err(|e| WechatError::Decode(e.to_string()))?;

            match StatusClass::of(envelope.errcode) {
                StatusClass::Ok => return Ok(0),
                StatusClass::RefreshAndRetry if attempt < MAX_CREDENTIAL_RETRIES => {
                    attempt += 1;
                    token = self.retry_token(url_template, &token, envelope.errcode).await?;
                }
                _ => {
                    envelope.check()?;
                    return Ok(0);
                }
            }
        }
    }

    /// Download into memory.
    pub async fn download(&self, url_template: &str) -> Result<Vec<u8>, WechatError> {
        let mut buffer = Vec::new();
        self.download_to(url_template, &mut buffer).await?;
        Ok(buffer)
    }

    /// Cached jsapi ticket, refreshed first when missing or near expiry.
    pub async fn get_ticket(&self) -> Result<String, WechatError> {
        self.ticket.get_or_refresh(|| self.fetch_ticket()).await
    }

    pub async fn refresh_ticket(&self) -> Result<String, WechatError> {
        self.ticket.refresh(|| self.fetch_ticket()).await
    }

    pub async fn set_ticket(&self, credential: Credential) {
        self.ticket.set(credential).await;
    }

    pub async fn ticket_info(&self) -> Option<Credential> {
        self.ticket.snapshot().await
    }

    async fn fetch_ticket(&self) -> Result<Credential, WechatError> {
        log::debug!("refreshing jsapi ticket for {}", self.client.appid());

        let response: TicketResponse = self
            .get_json(self.client.profile().ticket_url())
            .await
            .map_err(WechatError::credential_fetch)?;

        if response.ticket.is_empty() {
            return Err(WechatError::credential_fetch(WechatError::Decode(
                "credential response has no ticket".to_string(),
            )));
        }

        Credential::from_lifetime(response.ticket, response.expires_in, unix_now())
            .map_err(WechatError::credential_fetch)
    }

    async fn call<T, F>(&self, url_template: &str, build: F) -> Result<T, WechatError>
    where
        T: DeserializeOwned + WechatApiResponse,
        F: Fn(String) -> Result<reqwest::Request, reqwest::Error>,
    {
        let mut token = self.token_manager.get_token().await?;
        let mut attempt = 0;

        loop {
            let request = build(self.finish_url(url_template, &token))?;
            let response: T = self.client.execute_json(request).await?;

            let code = response.errcode();
            if StatusClass::of(code) == StatusClass::RefreshAndRetry
                && attempt < MAX_CREDENTIAL_RETRIES
            {
                attempt += 1;
                token = self.retry_token(url_template, &token, code).await?;
                continue;
            }

            return Ok(response);
        }
    }

    async fn retry_token(
        &self,
        url_template: &str,
        failed: &str,
        errcode: i32,
    ) -> Result<String, WechatError> {
        log::warn!(
            "[Wechat] errcode {} from {}, refreshing access_token and retrying once",
            errcode,
            url_template.split('?').next().unwrap_or(url_template)
        );
        self.token_manager.refresh_token_after(failed).await
    }

    fn finish_url(&self, url_template: &str, token: &str) -> String {
        WechatClient::append_credential(&self.client.resolve_url(url_template), token)
    }
}
