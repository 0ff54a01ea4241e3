//! Request parameters of the merchant pay endpoints.
//!
//! The merchant identity (`appid`/`mch_id`, or `mch_appid`/`mchid` for
//! transfers), `nonce_str` and `sign` are filled in by
//! [`PayClient`](super::PayClient) and are not part of these types.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::WechatError;

#[derive(Debug, Clone, Default, Serialize)]
pub struct UnifiedOrder {
    pub body: String,
    pub out_trade_no: String,
    /// In fen.
    pub total_fee: i64,
    pub spbill_create_ip: String,
    pub notify_url: String,
    /// `JSAPI`, `NATIVE`, `APP` ...
    pub trade_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attach: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_expire: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goods_tag: Option<String>,
    /// Required for `NATIVE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Required for `JSAPI`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
}

/// Identifies an order by WeChat transaction id or merchant order number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRef {
    TransactionId(String),
    OutTradeNo(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderQuery {
    #[serde(flatten)]
    pub order: OrderRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseOrder {
    pub out_trade_no: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    #[serde(flatten)]
    pub order: OrderRef,
    pub out_refund_no: String,
    pub total_fee: i64,
    pub refund_fee: i64,
    /// Defaults to the merchant id when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_trade_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_refund_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortUrl {
    pub long_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reverse {
    #[serde(flatten)]
    pub order: OrderRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadBill {
    /// `yyyyMMdd`
    pub bill_date: String,
    /// `ALL`, `SUCCESS`, `REFUND` ...
    pub bill_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

/// Payment with the code scanned from the buyer's device.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MicroPay {
    pub body: String,
    pub out_trade_no: String,
    /// In fen.
    pub total_fee: i64,
    pub spbill_create_ip: String,
    pub auth_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attach: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_expire: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goods_tag: Option<String>,
}

/// Merchant payout to a user's balance.
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub partner_trade_no: String,
    pub openid: String,
    /// `NO_CHECK`, `FORCE_CHECK` or `OPTION_CHECK`.
    pub check_name: String,
    /// Required unless `check_name` is `NO_CHECK`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_user_name: Option<String>,
    /// In fen.
    pub amount: i64,
    pub desc: String,
    pub spbill_create_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferQuery {
    pub partner_trade_no: String,
}

/// Flatten a request into string parameters. Null and empty values are
/// dropped, numbers and booleans are rendered as text.
pub(crate) fn to_params<T: Serialize + ?Sized>(
    request: &T,
) -> Result<BTreeMap<String, String>, WechatError> {
    let object = match serde_json::to_value(request)? {
        Value::Object(object) => object,
        other => {
            return Err(WechatError::Config(format!(
                "pay request must serialize to a map, got {}",
                other
            )))
        }
    };

    let mut params = BTreeMap::new();
    for (key, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            nested => {
                return Err(WechatError::Config(format!(
                    "pay parameter `{}` must be a scalar, got {}",
                    key, nested
                )))
            }
        };
        if !text.is_empty() {
            params.insert(key, text);
        }
    }
    Ok(params)
}
