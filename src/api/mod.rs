//! Endpoint wrappers
//!
//! Each wrapper is a thin typed layer over [`Transport`](crate::transport::Transport):
//!
//! - [`tag`] - Enterprise tag management, with per-endpoint non-fatal codes
//! - [`media`] - Media upload (including video material) and streaming download
//! - [`jssdk`] - `wx.config` signatures backed by the cached jsapi ticket
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wechat_sdk::client::Profile;
//! use wechat_sdk::Wechat;
//!
//! let corp = Wechat::builder().profile(Profile::Corp) /* ... */ .build()?;
//! let tag_id = corp.tags().create("ops").await?;
//! ```

pub mod jssdk;
pub mod media;
pub mod tag;
pub mod r#trait;

pub use jssdk::{JssdkApi, JssdkConfig};
pub use media::{MaterialUploadResponse, MediaApi, MediaType, MediaUploadResponse};
pub use r#trait::WechatApi;
pub use tag::{InvalidMembers, Tag, TagApi, TagMembers, TagUser};
