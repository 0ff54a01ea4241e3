//! Request and callback signatures
//!
//! Payment and JS-SDK signatures are both computed over the same canonical
//! parameter string: non-empty values, `sign` excluded, keys sorted
//! ascending, joined as `k=v&k=v`.

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::error::WechatError;

/// Name of the signature parameter itself, which never signs itself.
pub const SIGN_FIELD: &str = "sign";

/// Build the canonical `k=v&k=v` string.
///
/// ```rust
/// use wechat_sdk::crypto::signature::canonical_string;
///
/// let s = canonical_string([("b", "2"), ("a", "1"), ("c", ""), ("sign", "x")]);
/// assert_eq!(s, "a=1&b=2");
/// ```
pub fn canonical_string<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(K, V)> = params
        .into_iter()
        .filter(|(k, v)| k.as_ref() != SIGN_FIELD && !v.as_ref().is_empty())
        .collect();
    pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

    let mut out = String::new();
    for (i, (k, v)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(k.as_ref());
        out.push('=');
        out.push_str(v.as_ref());
    }
    out
}

/// Merchant payment signature: upper-case MD5 of the canonical string
/// followed by `key=<api_key>`.
pub fn pay_sign<I, K, V>(params: I, api_key: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut payload = canonical_string(params);
    if !payload.is_empty() {
        payload.push('&');
    }
    payload.push_str("key=");
    payload.push_str(api_key);

    hex::encode_upper(Md5::digest(payload.as_bytes()))
}

/// `wx.config` signature: lower-case SHA-1 hex.
pub fn jssdk_sign(jsapi_ticket: &str, noncestr: &str, timestamp: i64, url: &str) -> String {
    let timestamp = timestamp.to_string();
    let payload = canonical_string([
        ("jsapi_ticket", jsapi_ticket),
        ("noncestr", noncestr),
        ("timestamp", timestamp.as_str()),
        ("url", url),
    ]);

    hex::encode(Sha1::digest(payload.as_bytes()))
}

/// Callback message signature: SHA-1 over the four values sorted and
/// concatenated.
pub fn msg_sign(token: &str, timestamp: &str, nonce: &str, encrypt: &str) -> String {
    let mut parts = [token, timestamp, nonce, encrypt];
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Check the `msg_signature` of an incoming callback.
///
/// # Errors
/// `WechatError::Signature` on mismatch.
pub fn verify_msg_signature(
    token: &str,
    timestamp: &str,
    nonce: &str,
    encrypt: &str,
    signature: &str,
) -> Result<(), WechatError> {
    let expected = msg_sign(token, timestamp, nonce, encrypt);
    if !expected.eq_ignore_ascii_case(signature) {
        return Err(WechatError::Signature(format!(
            "msg_signature mismatch: expected {}, got {}",
            expected, signature
        )));
    }
    Ok(())
}
