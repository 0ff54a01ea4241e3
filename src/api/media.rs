//! Media upload and download
//!
//! Temporary media (`/cgi-bin/media/*`) expires three days after upload.
//! Videos kept as permanent material go through `add_material` together with
//! a JSON `description` field.
//!
//! ## Example
//!
//! ```ignore
//! use wechat_sdk::api::media::{MediaApi, MediaType};
//!
//! let media = wechat.media();
//! let image = std::fs::read("image.jpg")?;
//! let uploaded = media.upload(MediaType::Image, "image.jpg", &image).await?;
//!
//! let mut file = tokio::fs::File::create("copy.jpg").await?;
//! media.download_to(&uploaded.media_id, &mut file).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use crate::client::{encode_query_value, WechatClient};
use crate::error::WechatError;
use crate::transport::{MultipartUpload, Transport};
use crate::types::WechatApiResponse;

use super::WechatApi;

const UPLOAD_FIELD: &str = "media";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// jpg, png
    Image,
    /// mp3, amr
    Voice,
    /// mp4
    Video,
    Thumb,
    /// Any file; enterprise profile only.
    File,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Voice => "voice",
            MediaType::Video => "video",
            MediaType::Thumb => "thumb",
            MediaType::File => "file",
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUploadResponse {
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub media_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub(crate) errcode: i32,
    #[serde(default)]
    pub(crate) errmsg: String,
}

impl WechatApiResponse for MediaUploadResponse {
    fn errcode(&self) -> i32 {
        self.errcode
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialUploadResponse {
    #[serde(default)]
    pub media_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub(crate) errcode: i32,
    #[serde(default)]
    pub(crate) errmsg: String,
}

impl WechatApiResponse for MaterialUploadResponse {
    fn errcode(&self) -> i32 {
        self.errcode
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}

#[derive(Debug, Serialize)]
struct VideoDescription<'a> {
    title: &'a str,
    introduction: &'a str,
}

pub struct MediaApi {
    transport: Arc<Transport>,
}

impl MediaApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Upload temporary media
    ///
    /// POST /cgi-bin/media/upload?type=TYPE&access_token=ACCESS_TOKEN
    ///
    /// `filename` is the name sent in the multipart form, not a path.
    pub async fn upload(
        &self,
        media_type: MediaType,
        filename: &str,
        data: &[u8],
    ) -> Result<MediaUploadResponse, WechatError> {
        let url = format!(
            "/cgi-bin/media/upload?type={}&access_token=",
            media_type.as_str()
        );
        let upload = MultipartUpload::new(UPLOAD_FIELD, filename, data);

        self.transport.upload_multipart(&url, &upload).await
    }

    /// Upload a video as permanent material
    ///
    /// POST /cgi-bin/material/add_material?type=video&access_token=ACCESS_TOKEN
    ///
    /// `title` and `introduction` travel in the `description` form field.
    pub async fn upload_video(
        &self,
        filename: &str,
        data: &[u8],
        title: &str,
        introduction: &str,
    ) -> Result<MaterialUploadResponse, WechatError> {
        let description = VideoDescription {
            title,
            introduction,
        };
        let upload = MultipartUpload::new(UPLOAD_FIELD, filename, data)
            .json_field("description", &description)?;

        self.transport
            .upload_multipart("/cgi-bin/material/add_material?type=video&access_token=", &upload)
            .await
    }

    /// Stream temporary media into `sink`, returning the byte count.
    ///
    /// GET /cgi-bin/media/get?media_id=MEDIA_ID&access_token=ACCESS_TOKEN
    pub async fn download_to<W>(&self, media_id: &str, sink: &mut W) -> Result<u64, WechatError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.transport
            .download_to(&download_template(media_id), sink)
            .await
    }

    pub async fn download(&self, media_id: &str) -> Result<Vec<u8>, WechatError> {
        self.transport.download(&download_template(media_id)).await
    }

    /// Fully signed download URL, for handing off to a file server.
    ///
    /// The URL embeds the current access token and stops working once it
    /// rotates.
    pub async fn download_url(&self, media_id: &str) -> Result<String, WechatError> {
        let token = self.transport.token_manager().get_token().await?;
        let client = self.transport.client();

        Ok(WechatClient::append_credential(
            &client.resolve_url(&download_template(media_id)),
            &token,
        ))
    }
}

impl WechatApi for MediaApi {
    fn transport(&self) -> &Transport {
        &self.transport
    }

    fn api_name(&self) -> &'static str {
        "media"
    }
}

fn download_template(media_id: &str) -> String {
    format!(
        "/cgi-bin/media/get?media_id={}&access_token=",
        encode_query_value(media_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenManager;
    use crate::types::{AppId, AppSecret};
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_transport(base_url: &str) -> Arc<Transport> {
        let client = WechatClient::builder()
            .appid(AppId::new("wx1234567890abcdef").unwrap())
            .secret(AppSecret::new("secret1234567890ab").unwrap())
            .base_url(base_url)
            .build()
            .unwrap();
        let token_manager = Arc::new(TokenManager::new(client.clone()));
        Arc::new(Transport::new(Arc::new(client), token_manager))
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/cgi-bin/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test_token",
                "expires_in": 7200
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_media_type() {
        assert_eq!(MediaType::Image.as_str(), "image");
        assert_eq!(MediaType::Voice.as_str(), "voice");
        assert_eq!(MediaType::Video.as_str(), "video");
        assert_eq!(MediaType::Thumb.as_str(), "thumb");
        assert_eq!(MediaType::File.as_str(), "file");
    }

    #[test]
    fn test_download_template_escapes_media_id() {
        assert_eq!(
            download_template("a b/c"),
            "/cgi-bin/media/get?media_id=a%20b%2Fc&access_token="
        );
    }

    #[tokio::test]
    async fn test_upload_success() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/cgi-bin/media/upload"))
            .and(query_param("access_token", "test_token"))
            .and(query_param("type", "image"))
            .and(body_string_contains("filename=\"test.jpg\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "image",
                "media_id": "test_media_id_123",
                "created_at": 1234567890
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let media_api = MediaApi::new(create_test_transport(&mock_server.uri()));
        let response = media_api
            .upload(MediaType::Image, "test.jpg", b"fake_image_data")
            .await
            .unwrap();

        assert_eq!(response.media_type, "image");
        assert_eq!(response.media_id, "test_media_id_123");
        assert_eq!(response.created_at, 1234567890);
    }

    #[tokio::test]
    async fn test_upload_video_sends_description() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/cgi-bin/material/add_material"))
            .and(query_param("type", "video"))
            .and(body_string_contains("name=\"description\""))
            .and(body_string_contains(
                r#"{"title":"Launch","introduction":"<b>new</b> & improved"}"#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "media_id": "video_1",
                "url": ""
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let media_api = MediaApi::new(create_test_transport(&mock_server.uri()));
        let response = media_api
            .upload_video("clip.mp4", b"mp4", "Launch", "<b>new</b> & improved")
            .await
            .unwrap();

        assert_eq!(response.media_id, "video_1");
    }

    #[tokio::test]
    async fn test_download_binary() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/cgi-bin/media/get"))
            .and(query_param("access_token", "test_token"))
            .and(query_param("media_id", "test_media_id"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"media_binary_data".to_vec(), "image/jpeg"),
            )
            .mount(&mock_server)
            .await;

        let media_api = MediaApi::new(create_test_transport(&mock_server.uri()));

        let mut sink = Vec::new();
        let written = media_api
            .download_to("test_media_id", &mut sink)
            .await
            .unwrap();

        assert_eq!(written, 17);
        assert_eq!(sink, b"media_binary_data");
    }

    #[tokio::test]
    async fn test_download_error_envelope() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/cgi-bin/media/get"))
            .and(query_param("media_id", "expired_media"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errcode": 40007,
                "errmsg": "invalid media_id"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let media_api = MediaApi::new(create_test_transport(&mock_server.uri()));
        let result = media_api.download("expired_media").await;

        match result {
            Err(WechatError::Api { code, message }) => {
                assert_eq!(code, 40007);
                assert_eq!(message, "invalid media_id");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_url_embeds_token() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        let media_api = MediaApi::new(create_test_transport(&mock_server.uri()));
        let url = media_api.download_url("m1").await.unwrap();

        assert_eq!(
            url,
            format!(
                "{}/cgi-bin/media/get?media_id=m1&access_token=test_token",
                mock_server.uri()
            )
        );
    }
}
