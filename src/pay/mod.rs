//! Merchant payments (XML API at `api.mch.weixin.qq.com`)
//!
//! Unlike the JSON endpoints, pay calls carry no access token: each request
//! is signed with the merchant API key and each reply is verified the same
//! way.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wechat_sdk::pay::{PayClient, UnifiedOrder};
//! use wechat_sdk::types::{ApiKey, AppId, MchId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pay = PayClient::builder()
//!         .appid(AppId::new("wxd930ea5d5a258f4f")?)
//!         .mch_id(MchId::new("10000100")?)
//!         .api_key(ApiKey::new("192006250b4c09247ec02edce69f6a2d")?)
//!         .build()?;
//!
//!     let order = UnifiedOrder {
//!         body: "T-shirt".into(),
//!         out_trade_no: "20150806125346".into(),
//!         total_fee: 1,
//!         spbill_create_ip: "123.12.12.123".into(),
//!         notify_url: "https://example.com/notify".into(),
//!         trade_type: "NATIVE".into(),
//!         product_id: Some("sku-1".into()),
//!         ..Default::default()
//!     };
//!
//!     let response = pay.unified_order(&order).await?;
//!     if response.is_business_success() {
//!         println!("code_url: {:?}", response.get("code_url"));
//!     }
//!     Ok(())
//! }
//! ```

mod client;
pub mod request;
mod response;
mod xml;

pub use client::{PayClient, PayClientBuilder, DEFAULT_PAY_BASE_URL};
pub use request::{
    CloseOrder, DownloadBill, MicroPay, OrderQuery, OrderRef, Refund, RefundQuery, Reverse,
    ShortUrl, Transfer, TransferQuery, UnifiedOrder,
};
pub use response::{PayResponse, RESULT_CODE_SUCCESS, RETURN_CODE_SUCCESS};
