//! Base trait for endpoint wrappers.

use crate::transport::Transport;

/// Trait for WeChat API implementations.
///
/// Every wrapper holds a shared [`Transport`] and issues its calls through it,
/// so all of them get the same credential handling and retry policy.
pub trait WechatApi: Send + Sync {
    fn transport(&self) -> &Transport;

    /// Name used in log lines.
    fn api_name(&self) -> &'static str {
        "unknown"
    }
}
