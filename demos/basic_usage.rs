//! Basic usage example for wechat-sdk
//!
//! Run with: cargo run --example basic_usage
//!
//! Reads `WECHAT_CORP_ID` / `WECHAT_CORP_SECRET`; without them only the
//! offline parts (message encryption) run.

use wechat_sdk::crypto::{build_encrypted_reply, MessageCipher, ReplyParams};
use wechat_sdk::middleware::LoggingMiddleware;
use wechat_sdk::{
    types::{AppId, AppSecret},
    Profile, Wechat,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cipher = MessageCipher::new(
        "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG",
        "ww1234567890abcdef",
    )?;
    let reply = build_encrypted_reply(
        &cipher,
        &ReplyParams {
            token: "callback_token",
            timestamp: 1409659813,
            nonce: "1372623149",
        },
        b"<xml><Content>pong</Content></xml>",
    )?;
    println!("Encrypted reply:\n{}", reply.to_xml());

    let (Ok(corp_id), Ok(secret)) = (
        std::env::var("WECHAT_CORP_ID"),
        std::env::var("WECHAT_CORP_SECRET"),
    ) else {
        return Ok(());
    };

    let wechat = Wechat::builder()
        .profile(Profile::Corp)
        .appid(AppId::new(corp_id)?)
        .secret(AppSecret::new(secret)?)
        .with_middleware(LoggingMiddleware::new())
        .build()?;

    for tag in wechat.tags().list().await? {
        println!("tag {}: {}", tag.id, tag.name);
    }

    let config = wechat.jssdk().config("https://example.com/page").await?;
    println!("wx.config signature: {}", config.signature);

    Ok(())
}
