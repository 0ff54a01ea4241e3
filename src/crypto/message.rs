//! AES-256-CBC callback message encryption
//!
//! Encrypted callbacks and their replies carry
//! `base64(AES-256-CBC(random(16) || len(u32 BE) || msg || app_id))`.
//! The key is the 43-character EncodingAESKey decoded as base64, the IV is
//! the first 16 key bytes, and padding is PKCS#7 over 32-byte blocks.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD as BASE64};
use base64::Engine;
use cbc::cipher::block_padding::NoPadding;
use cbc::{Decryptor, Encryptor};
use rand::RngCore;

use crate::error::WechatError;

use super::signature::msg_sign;

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

const KEY_LEN: usize = 32;
const RANDOM_LEN: usize = 16;
const LENGTH_PREFIX_LEN: usize = 4;
const PAD_BLOCK: usize = 32;

/// EncodingAESKeys are not always canonical base64 in their last symbol.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Encrypts and decrypts callback payloads for one app id.
#[derive(Clone)]
pub struct MessageCipher {
    key: [u8; KEY_LEN],
    app_id: String,
}

impl std::fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCipher")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

impl MessageCipher {
    /// Build from the 43-character EncodingAESKey shown in the console.
    ///
    /// # Errors
    /// `WechatError::Crypto` if the key does not decode to 32 bytes.
    pub fn new(encoding_aes_key: &str, app_id: impl Into<String>) -> Result<Self, WechatError> {
        let decoded = LENIENT_BASE64
            .decode(format!("{encoding_aes_key}="))
            .map_err(|e| WechatError::Crypto(format!("Invalid EncodingAESKey: {}", e)))?;

        let key: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            WechatError::Crypto(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LEN,
                decoded.len()
            ))
        })?;

        Ok(Self::from_key(key, app_id))
    }

    pub fn from_key(key: [u8; KEY_LEN], app_id: impl Into<String>) -> Self {
        Self {
            key,
            app_id: app_id.into(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Encrypt `msg` with a fresh random prefix; returns base64.
    pub fn encrypt(&self, msg: &[u8]) -> Result<String, WechatError> {
        let mut random = [0u8; RANDOM_LEN];
        rand::thread_rng().fill_bytes(&mut random);
        self.encrypt_with_random(&random, msg)
    }

    /// Encrypt with a caller-chosen random prefix.
    pub fn encrypt_with_random(
        &self,
        random: &[u8; RANDOM_LEN],
        msg: &[u8],
    ) -> Result<String, WechatError> {
        let msg_len = u32::try_from(msg.len())
            .map_err(|_| WechatError::Crypto("message too long".to_string()))?;

        let capacity = RANDOM_LEN + LENGTH_PREFIX_LEN + msg.len() + self.app_id.len() + PAD_BLOCK;
        let mut buffer = Vec::with_capacity(capacity);
        buffer.extend_from_slice(random);
        buffer.extend_from_slice(&msg_len.to_be_bytes());
        buffer.extend_from_slice(msg);
        buffer.extend_from_slice(self.app_id.as_bytes());

        let pad = PAD_BLOCK - buffer.len() % PAD_BLOCK;
        buffer.resize(buffer.len() + pad, pad as u8);

        let len = buffer.len();
        let encryptor = Aes256CbcEnc::new(self.key[..].into(), self.key[..16].into());
        encryptor
            .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
            .map_err(|e| WechatError::Crypto(format!("Encryption failed: {:?}", e)))?;

        Ok(BASE64.encode(&buffer))
    }

    /// Decrypt a base64 payload and return the inner message.
    ///
    /// # Errors
    /// `WechatError::Crypto` for malformed input, bad padding, or a payload
    /// addressed to a different app id.
    pub fn decrypt(&self, encrypted: &str) -> Result<Vec<u8>, WechatError> {
        let mut buffer = BASE64
            .decode(encrypted)
            .map_err(|e| WechatError::Crypto(format!("Invalid encrypted payload: {}", e)))?;

        let decryptor = Aes256CbcDec::new(self.key[..].into(), self.key[..16].into());
        let plain_len = decryptor
            .decrypt_padded_mut::<NoPadding>(&mut buffer)
            .map_err(|e| WechatError::Crypto(format!("Decryption failed: {:?}", e)))?
            .len();
        buffer.truncate(plain_len);

        let pad = buffer.last().copied().unwrap_or(0) as usize;
        if pad == 0 || pad > PAD_BLOCK || pad > buffer.len() {
            return Err(WechatError::Crypto(format!("Invalid padding: {}", pad)));
        }
        buffer.truncate(buffer.len() - pad);

        let header = RANDOM_LEN + LENGTH_PREFIX_LEN;
        if buffer.len() < header {
            return Err(WechatError::Crypto("Payload too short".to_string()));
        }

        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        prefix.copy_from_slice(&buffer[RANDOM_LEN..header]);
        let msg_len = u32::from_be_bytes(prefix) as usize;

        let msg_end = header
            .checked_add(msg_len)
            .filter(|end| *end <= buffer.len())
            .ok_or_else(|| WechatError::Crypto(format!("Invalid message length: {}", msg_len)))?;

        let app_id = &buffer[msg_end..];
        if app_id != self.app_id.as_bytes() {
            return Err(WechatError::Crypto(format!(
                "App id mismatch: expected {}, got {}",
                self.app_id,
                String::from_utf8_lossy(app_id)
            )));
        }

        Ok(buffer[header..msg_end].to_vec())
    }
}

/// Request-side values echoed into an encrypted reply.
#[derive(Debug, Clone)]
pub struct ReplyParams<'a> {
    pub token: &'a str,
    pub timestamp: i64,
    pub nonce: &'a str,
}

/// Body of an encrypted passive reply.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub encrypt: String,
    pub msg_signature: String,
    pub timestamp: i64,
    pub nonce: String,
}

impl ReplyEnvelope {
    pub fn to_xml(&self) -> String {
        format!(
            "<xml><Encrypt>{}</Encrypt><MsgSignature>{}</MsgSignature><TimeStamp>{}</TimeStamp><Nonce>{}</Nonce></xml>",
            quick_xml::escape::escape(self.encrypt.as_str()),
            quick_xml::escape::escape(self.msg_signature.as_str()),
            self.timestamp,
            quick_xml::escape::escape(self.nonce.as_str()),
        )
    }
}

/// Encrypt a reply message and sign it for the callback response.
pub fn build_encrypted_reply(
    cipher: &MessageCipher,
    params: &ReplyParams<'_>,
    msg_xml: &[u8],
) -> Result<ReplyEnvelope, WechatError> {
    let encrypt = cipher.encrypt(msg_xml)?;
    let timestamp = params.timestamp.to_string();
    let msg_signature = msg_sign(params.token, &timestamp, params.nonce, &encrypt);

    Ok(ReplyEnvelope {
        encrypt,
        msg_signature,
        timestamp: params.timestamp,
        nonce: params.nonce.to_string(),
    })
}
