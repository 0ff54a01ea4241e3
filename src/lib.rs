//! WeChat SDK for Rust
//!
//! Client for the WeChat enterprise ("corp"), official-account and merchant
//! pay server APIs.
//!
//! Every authenticated call goes through one [`Transport`](transport::Transport):
//! it attaches the cached access token to the URL, decodes the JSON reply,
//! and when the reply says the token expired (`42001`) or is invalid
//! (`40001`) it refreshes the token and repeats the call exactly once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wechat_sdk::client::Profile;
//! use wechat_sdk::types::{AppId, AppSecret};
//! use wechat_sdk::Wechat;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wechat = Wechat::builder()
//!         .profile(Profile::Account)
//!         .appid(AppId::new("wx1234567890abcdef")?)
//!         .secret(AppSecret::new("your_secret")?)
//!         .build()?;
//!
//!     let config = wechat.jssdk().config("https://example.com/page").await?;
//!     println!("wx.config signature: {}", config.signature);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Endpoint wrappers (tags, media, JS-SDK)
//! - [`client`] - HTTP client, integration profiles and the [`Wechat`] facade
//! - [`crypto`] - Signatures and callback message encryption
//! - [`error`] - Error types
//! - [`middleware`] - Tower layers for the HTTP pipeline
//! - [`pay`] - Merchant payments over signed XML
//! - [`token`] - Credential cache (access token and jsapi ticket)
//! - [`transport`] - Authenticated request cycle with one-shot retry
//! - [`types`] - Identity newtypes and the status-code envelope
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! use wechat_sdk::WechatError;
//!
//! match wechat.tags().create("ops").await {
//!     Ok(id) => println!("tag {}", id),
//!     Err(WechatError::Api { code, message }) => eprintln!("API error {}: {}", code, message),
//!     Err(WechatError::CredentialFetch(source)) => eprintln!("no token: {}", source),
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

pub mod api;
pub mod client;
pub mod crypto;
pub mod error;
pub mod middleware;
pub mod pay;
pub mod token;
pub mod transport;
pub mod types;
mod utils;

pub use client::{Profile, Wechat, WechatBuilder, WechatClient, WechatClientBuilder};
pub use error::WechatError;
