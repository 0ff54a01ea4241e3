//! Signatures and callback message encryption
//!
//! - [`signature`]: canonical parameter string, payment MD5 sign, JS-SDK and
//!   callback SHA-1 signs
//! - [`message`]: AES-256-CBC cipher for encrypted callbacks and replies
//!
//! ## Usage
//!
//! ```rust
//! use wechat_sdk::crypto::{build_encrypted_reply, MessageCipher, ReplyParams};
//!
//! # fn main() -> Result<(), wechat_sdk::WechatError> {
//! let cipher = MessageCipher::new("abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG", "wx1234567890abcdef")?;
//! let params = ReplyParams { token: "token", timestamp: 1409659813, nonce: "nonce" };
//! let reply = build_encrypted_reply(&cipher, &params, b"<xml><Content>hi</Content></xml>")?;
//! assert!(reply.to_xml().starts_with("<xml><Encrypt>"));
//! # Ok(())
//! # }
//! ```

pub mod message;
pub mod signature;

pub use message::{build_encrypted_reply, MessageCipher, ReplyEnvelope, ReplyParams};
pub use signature::{
    canonical_string, jssdk_sign, msg_sign, pay_sign, verify_msg_signature, SIGN_FIELD,
};
