//! WeChat HTTP Client module
//!
//! [`WechatClient`] is the low-level HTTP client bound to one identity and
//! [`Profile`]; [`Wechat`] is the facade most callers start from.

mod profile;
pub use profile::Profile;

mod wechat_client;
pub(crate) use wechat_client::encode_query_value;
pub(crate) use wechat_client::validate_base_url;
pub(crate) use wechat_client::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
pub use wechat_client::{WechatClient, WechatClientBuilder};

mod wechat;
pub use wechat::Wechat;

mod builder;
pub use builder::WechatBuilder;
