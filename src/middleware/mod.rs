//! Tower middleware for the HTTP pipeline.
//!
//! Layers wrap [`WechatClient`](crate::WechatClient) and see every request
//! the SDK sends, including credential fetches and retries.
//!
//! ## Usage
//!
//! ```rust
//! use wechat_sdk::middleware::LoggingMiddleware;
//! use wechat_sdk::types::{AppId, AppSecret};
//! use wechat_sdk::Wechat;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let wechat = Wechat::builder()
//!     .appid(AppId::new("wx1234567890abcdef")?)
//!     .secret(AppSecret::new("your_secret")?)
//!     .with_middleware(LoggingMiddleware::new())
//!     .build()?;
//! # let _ = wechat;
//! # Ok(())
//! # }
//! ```

pub use tower::{Layer, Service, ServiceBuilder};

mod logging;

pub use logging::{LoggingMiddleware, LoggingMiddlewareService};
