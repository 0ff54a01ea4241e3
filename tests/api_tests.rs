//! Endpoint wrapper tests (tags, JS-SDK, media links).

use wechat_sdk::client::Profile;
use wechat_sdk::crypto::jssdk_sign;
use wechat_sdk::types::{AppId, AppSecret};
use wechat_sdk::{Wechat, WechatError};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn corp_with_token(server: &MockServer) -> Wechat {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/gettoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "access_token": "corp_token",
            "expires_in": 7200
        })))
        .mount(server)
        .await;

    Wechat::builder()
        .profile(Profile::Corp)
        .appid(AppId::new("ww1234567890abcdef").unwrap())
        .secret(AppSecret::new("corp_secret_12345").unwrap())
        .base_url(server.uri())
        .build()
        .unwrap()
}

fn users(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn test_tag_list() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/tag/list"))
        .and(query_param("access_token", "corp_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "taglist": [
                {"tagid": 1, "tagname": "ops"},
                {"tagid": 2, "tagname": "dev"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tags = wechat.tags().list().await.unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[1].id, 2);
    assert_eq!(tags[1].name, "dev");
}

#[tokio::test]
async fn test_tag_update_and_delete() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/tag/update"))
        .and(body_json(serde_json::json!({"tagid": 7, "tagname": "oncall"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "updated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/tag/delete"))
        .and(query_param("tagid", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "deleted"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tags = wechat.tags();
    tags.update(7, "oncall").await.unwrap();
    tags.delete(7).await.unwrap();
}

#[tokio::test]
async fn test_tag_members() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/tag/get"))
        .and(query_param("tagid", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "userlist": [{"userid": "zhangsan", "name": "San Zhang"}],
            "partylist": [2, 5]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let members = wechat.tags().members(3).await.unwrap();
    assert_eq!(members.users.len(), 1);
    assert_eq!(members.users[0].userid, "zhangsan");
    assert_eq!(members.parties, vec![2, 5]);
}

#[tokio::test]
async fn test_add_users_reports_partial_rejects() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/tag/addtagusers"))
        .and(body_json(serde_json::json!({
            "tagid": 3,
            "userlist": ["a", "b", "c"],
            "partylist": [4]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "invalidlist": "b|c",
            "invalidparty": [4]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let invalid = wechat
        .tags()
        .add_users(3, &users(&["a", "b", "c"]), &[4])
        .await
        .unwrap();

    assert_eq!(invalid.users, users(&["b", "c"]));
    assert_eq!(invalid.parties, vec![4]);
}

#[tokio::test]
async fn test_add_users_all_rejected() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/tag/addtagusers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40070,
            "errmsg": "all list invalid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let invalid = wechat
        .tags()
        .add_users(3, &users(&["ghost"]), &[99])
        .await
        .unwrap();

    assert_eq!(invalid.users, users(&["ghost"]));
    assert_eq!(invalid.parties, vec![99]);
}

#[tokio::test]
async fn test_delete_users_all_rejected() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/tag/deltagusers"))
        .and(body_json(serde_json::json!({"tagid": 3, "userlist": ["ghost"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40031,
            "errmsg": "all list invalid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let invalid = wechat
        .tags()
        .delete_users(3, &users(&["ghost"]), &[])
        .await
        .unwrap();

    assert_eq!(invalid.users, users(&["ghost"]));
    assert!(invalid.parties.is_empty());
}

#[tokio::test]
async fn test_membership_code_of_other_operation_is_error() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/tag/deltagusers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40070,
            "errmsg": "all list invalid"
        })))
        .mount(&server)
        .await;

    let err = wechat
        .tags()
        .delete_users(3, &users(&["ghost"]), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, WechatError::Api { code: 40070, .. }));
}

#[tokio::test]
async fn test_empty_membership_change_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/gettoken"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/tag/addtagusers"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let wechat = Wechat::builder()
        .profile(Profile::Corp)
        .appid(AppId::new("ww1234567890abcdef").unwrap())
        .secret(AppSecret::new("corp_secret_12345").unwrap())
        .base_url(server.uri())
        .build()
        .unwrap();

    let invalid = wechat.tags().add_users(3, &[], &[]).await.unwrap();
    assert!(invalid.is_empty());
}

#[tokio::test]
async fn test_jssdk_config_signs_page_url() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/get_jsapi_ticket"))
        .and(query_param("access_token", "corp_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "ticket": "corp_jsapi_ticket",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = wechat
        .jssdk()
        .config("https://example.com/page?id=1#section")
        .await
        .unwrap();

    assert_eq!(config.app_id, "ww1234567890abcdef");
    assert_eq!(config.nonce_str.len(), 16);
    assert_eq!(
        config.signature,
        jssdk_sign(
            "corp_jsapi_ticket",
            &config.nonce_str,
            config.timestamp,
            "https://example.com/page?id=1"
        )
    );

    let json = serde_json::to_value(&config).unwrap();
    assert!(json.get("appId").is_some());
    assert!(json.get("nonceStr").is_some());
}

#[tokio::test]
async fn test_media_download_url() {
    let server = MockServer::start().await;
    let wechat = corp_with_token(&server).await;

    let url = wechat.media().download_url("media id/1").await.unwrap();

    assert_eq!(
        url,
        format!(
            "{}/cgi-bin/media/get?media_id=media%20id%2F1&access_token=corp_token",
            server.uri()
        )
    );
}

#[tokio::test]
async fn test_tags_rejected_on_account_profile() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/tag/list"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let wechat = Wechat::builder()
        .appid(AppId::new("wx1234567890abcdef").unwrap())
        .secret(AppSecret::new("test_secret_12345").unwrap())
        .base_url(server.uri())
        .build()
        .unwrap();

    let tags = wechat.tags();
    assert!(matches!(tags.list().await, Err(WechatError::Config(_))));
    assert!(matches!(tags.create("ops").await, Err(WechatError::Config(_))));
    assert!(matches!(
        tags.add_users(3, &users(&["zhangsan"]), &[]).await,
        Err(WechatError::Config(_))
    ));
}
