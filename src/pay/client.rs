use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::client::{
    encode_query_value, validate_base_url, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use crate::crypto::{pay_sign, SIGN_FIELD};
use crate::error::WechatError;
use crate::types::{ApiKey, AppId, MchId};
use crate::utils::nonce_str;

use super::request::{
    to_params, CloseOrder, DownloadBill, MicroPay, OrderQuery, Refund, RefundQuery, Reverse,
    ShortUrl, Transfer, TransferQuery, UnifiedOrder,
};
use super::response::{PayResponse, RETURN_CODE_SUCCESS};
use super::xml::{decode_xml, encode_xml};

pub const DEFAULT_PAY_BASE_URL: &str = "https://api.mch.weixin.qq.com";

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Names the merchant identity travels under, and whether the reply is signed.
#[derive(Debug, Clone, Copy)]
struct Envelope {
    appid_key: &'static str,
    mch_id_key: &'static str,
    signed_reply: bool,
}

const PAY_ENVELOPE: Envelope = Envelope {
    appid_key: "appid",
    mch_id_key: "mch_id",
    signed_reply: true,
};

const RED_PACK_ENVELOPE: Envelope = Envelope {
    appid_key: "wxappid",
    mch_id_key: "mch_id",
    signed_reply: true,
};

// Transfer replies carry no sign.
const TRANSFER_ENVELOPE: Envelope = Envelope {
    appid_key: "mch_appid",
    mch_id_key: "mchid",
    signed_reply: false,
};

/// Merchant pay client.
///
/// Every request is completed with `appid`, `mch_id` and a fresh
/// `nonce_str`, signed with the API key and posted as XML. Replies are
/// accepted only when `return_code` is `SUCCESS` and their signature
/// verifies.
///
/// Red packs use `wxappid` and transfers use `mch_appid`/`mchid` for the
/// identity instead; transfer replies are not signed and are not verified.
///
/// Refund, reverse, red packs and transfers need the merchant certificate;
/// configure it with [`PayClientBuilder::identity_pem`].
#[derive(Clone)]
pub struct PayClient {
    http: Client,
    appid: AppId,
    mch_id: MchId,
    api_key: ApiKey,
    base_url: String,
}

impl std::fmt::Debug for PayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayClient")
            .field("appid", &self.appid)
            .field("mch_id", &self.mch_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PayClient {
    pub fn builder() -> PayClientBuilder {
        PayClientBuilder::default()
    }

    pub fn appid(&self) -> &str {
        self.appid.as_str()
    }

    pub fn mch_id(&self) -> &str {
        self.mch_id.as_str()
    }

    /// Sign parameters with the merchant API key.
    pub fn sign<I, K, V>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pay_sign(params, self.api_key.as_str())
    }

    /// Check the `sign` field of a reply or notification.
    ///
    /// # Errors
    /// `WechatError::Signature` when `sign` is missing or does not match.
    pub fn verify(&self, fields: &BTreeMap<String, String>) -> Result<(), WechatError> {
        let received = fields
            .get(SIGN_FIELD)
            .ok_or_else(|| WechatError::Signature("no sign parameter".to_string()))?;

        let expected = self.sign(fields);
        if !expected.eq_ignore_ascii_case(received) {
            log::warn!("[WechatPay] signature mismatch for mch_id {}", self.mch_id());
            return Err(WechatError::Signature(format!(
                "check signature failed, input: {:?}, local: {:?}",
                received, expected
            )));
        }
        Ok(())
    }

    /// Sign and post `request` to `path`, then verify the reply.
    ///
    /// # Errors
    /// - `WechatError::Transport` / `HttpStatus` as sent/received
    /// - `WechatError::Decode` for a malformed body or missing `return_code`
    /// - `WechatError::Pay` when `return_code` is not `SUCCESS`
    /// - `WechatError::Signature` when the reply signature is missing or wrong
    pub async fn post_xml<T: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &T,
    ) -> Result<PayResponse, WechatError> {
        self.post_envelope(path, request, PAY_ENVELOPE).await
    }

    /// POST /pay/unifiedorder
    pub async fn unified_order(&self, request: &UnifiedOrder) -> Result<PayResponse, WechatError> {
        self.post_xml("/pay/unifiedorder", request).await
    }

    /// POST /pay/orderquery
    pub async fn order_query(&self, request: &OrderQuery) -> Result<PayResponse, WechatError> {
        self.post_xml("/pay/orderquery", request).await
    }

    /// POST /pay/closeorder
    pub async fn close_order(&self, request: &CloseOrder) -> Result<PayResponse, WechatError> {
        self.post_xml("/pay/closeorder", request).await
    }

    /// POST /secapi/pay/refund (client certificate required)
    pub async fn refund(&self, request: &Refund) -> Result<PayResponse, WechatError> {
        let mut request = request.clone();
        request
            .op_user_id
            .get_or_insert_with(|| self.mch_id().to_string());
        self.post_xml("/secapi/pay/refund", &request).await
    }

    /// POST /pay/refundquery
    pub async fn refund_query(&self, request: &RefundQuery) -> Result<PayResponse, WechatError> {
        self.post_xml("/pay/refundquery", request).await
    }

    /// POST /tools/shorturl
    pub async fn short_url(&self, request: &ShortUrl) -> Result<PayResponse, WechatError> {
        self.post_xml("/tools/shorturl", request).await
    }

    /// POST /payitil/report
    pub async fn report(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<PayResponse, WechatError> {
        self.post_xml("/payitil/report", params).await
    }

    /// POST /secapi/pay/reverse (client certificate required)
    pub async fn reverse(&self, request: &Reverse) -> Result<PayResponse, WechatError> {
        self.post_xml("/secapi/pay/reverse", request).await
    }

    /// POST /pay/micropay
    pub async fn micro_pay(&self, request: &MicroPay) -> Result<PayResponse, WechatError> {
        self.post_xml("/pay/micropay", request).await
    }

    /// POST /mmpaymkttransfers/sendredpack (client certificate required)
    ///
    /// The identity goes out as `wxappid` and `mch_id`.
    pub async fn send_red_pack(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<PayResponse, WechatError> {
        self.post_envelope("/mmpaymkttransfers/sendredpack", params, RED_PACK_ENVELOPE)
            .await
    }

    /// POST /mmpaymkttransfers/promotion/transfers (client certificate required)
    pub async fn transfer(&self, request: &Transfer) -> Result<PayResponse, WechatError> {
        self.post_envelope(
            "/mmpaymkttransfers/promotion/transfers",
            request,
            TRANSFER_ENVELOPE,
        )
        .await
    }

    /// POST /mmpaymkttransfers/gettransferinfo (client certificate required)
    pub async fn find_transfer(
        &self,
        request: &TransferQuery,
    ) -> Result<PayResponse, WechatError> {
        self.post_envelope(
            "/mmpaymkttransfers/gettransferinfo",
            request,
            TRANSFER_ENVELOPE,
        )
        .await
    }

    /// POST /pay/downloadbill
    ///
    /// Returns the raw bill. An XML reply instead of bill data is an error.
    pub async fn download_bill(&self, request: &DownloadBill) -> Result<Vec<u8>, WechatError> {
        let body = self.signed_body(request, PAY_ENVELOPE)?;
        let reply = self.send("/pay/downloadbill", body).await?;

        let first_byte = reply.iter().find(|b| !b.is_ascii_whitespace());
        if first_byte == Some(&b'<') {
            if let Ok(fields) = decode_xml(&reply) {
                if let Some(code) = fields.get("return_code") {
                    return Err(WechatError::Pay {
                        code: code.clone(),
                        message: fields.get("return_msg").cloned().unwrap_or_default(),
                    });
                }
            }
        }
        Ok(reply)
    }

    /// `weixin://wxpay/bizpayurl?...` link for a native-pay QR code.
    pub fn biz_pay_url(&self, product_id: &str, timestamp: &str, nonce_str: &str) -> String {
        let sign = self.sign([
            ("appid", self.appid()),
            ("mch_id", self.mch_id()),
            ("product_id", product_id),
            ("time_stamp", timestamp),
            ("nonce_str", nonce_str),
        ]);

        format!(
            "weixin://wxpay/bizpayurl?sign={}&appid={}&mch_id={}&product_id={}&time_stamp={}&nonce_str={}",
            sign,
            encode_query_value(self.appid()),
            encode_query_value(self.mch_id()),
            encode_query_value(product_id),
            encode_query_value(timestamp),
            encode_query_value(nonce_str),
        )
    }

    async fn post_envelope<T: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &T,
        envelope: Envelope,
    ) -> Result<PayResponse, WechatError> {
        let body = self.signed_body(request, envelope)?;
        let reply = self.send(path, body).await?;
        let fields = decode_xml(&reply)?;
        self.check_reply(fields, envelope.signed_reply)
    }

    fn signed_body<T: Serialize + ?Sized>(
        &self,
        request: &T,
        envelope: Envelope,
    ) -> Result<String, WechatError> {
        let mut params = to_params(request)?;
        params.remove(SIGN_FIELD);
        params
            .entry(envelope.appid_key.to_string())
            .or_insert_with(|| self.appid().to_string());
        params
            .entry(envelope.mch_id_key.to_string())
            .or_insert_with(|| self.mch_id().to_string());
        params
            .entry("nonce_str".to_string())
            .or_insert_with(nonce_str);

        let sign = self.sign(&params);
        params.insert(SIGN_FIELD.to_string(), sign);
        Ok(encode_xml(&params))
    }

    async fn send(&self, path: &str, body: String) -> Result<Vec<u8>, WechatError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("[WechatPay] POST {}", url);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WechatError::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn check_reply(
        &self,
        fields: BTreeMap<String, String>,
        signed: bool,
    ) -> Result<PayResponse, WechatError> {
        let return_code = fields
            .get("return_code")
            .ok_or_else(|| WechatError::Decode("no return_code parameter".to_string()))?;

        if return_code != RETURN_CODE_SUCCESS {
            return Err(WechatError::Pay {
                code: return_code.clone(),
                message: fields.get("return_msg").cloned().unwrap_or_default(),
            });
        }

        if signed {
            self.verify(&fields)?;
        }
        Ok(PayResponse::new(fields))
    }
}

/// Builder for [`PayClient`]
#[derive(Default)]
pub struct PayClientBuilder {
    appid: Option<AppId>,
    mch_id: Option<MchId>,
    api_key: Option<ApiKey>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    #[cfg(feature = "rustls-tls")]
    identity_pem: Option<Vec<u8>>,
}

impl std::fmt::Debug for PayClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayClientBuilder")
            .field("appid", &self.appid)
            .field("mch_id", &self.mch_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PayClientBuilder {
    pub fn appid(mut self, appid: AppId) -> Self {
        self.appid = Some(appid);
        self
    }

    pub fn mch_id(mut self, mch_id: MchId) -> Self {
        self.mch_id = Some(mch_id);
        self
    }

    pub fn api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Default: `https://api.mch.weixin.qq.com`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Merchant certificate and private key, concatenated in one PEM buffer.
    #[cfg(feature = "rustls-tls")]
    pub fn identity_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.identity_pem = Some(pem.into());
        self
    }

    /// # Errors
    /// `WechatError::Config` when a required field is missing, the base URL
    /// is invalid, or the certificate cannot be parsed.
    pub fn build(self) -> Result<PayClient, WechatError> {
        let appid = self
            .appid
            .ok_or_else(|| WechatError::Config("appid is required".to_string()))?;
        let mch_id = self
            .mch_id
            .ok_or_else(|| WechatError::Config("mch_id is required".to_string()))?;
        let api_key = self
            .api_key
            .ok_or_else(|| WechatError::Config("api_key is required".to_string()))?;

        let base_url = validate_base_url(
            self.base_url
                .unwrap_or_else(|| DEFAULT_PAY_BASE_URL.to_string()),
        )?;

        let http = Client::builder()
            .timeout(
                self.timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            )
            .connect_timeout(
                self.connect_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            );

        #[cfg(feature = "rustls-tls")]
        let http = match &self.identity_pem {
            Some(pem) => http.identity(reqwest::Identity::from_pem(pem).map_err(|e| {
                WechatError::Config(format!("invalid client certificate: {}", e))
            })?),
            None => http,
        };

        Ok(PayClient {
            http: http.build()?,
            appid,
            mch_id,
            api_key,
            base_url,
        })
    }
}
