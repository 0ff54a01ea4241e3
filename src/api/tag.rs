//! Corp tag management
//!
//! Tags group users and departments of an enterprise account. Adding or
//! removing members reports the entries the server refused instead of failing
//! the whole call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::Profile;
use crate::error::WechatError;
use crate::transport::Transport;
use crate::types::{ApiResponseBase, WechatApiResponse, ERRCODE_OK};

use super::WechatApi;

/// `addtagusers`: none of the submitted users or departments were accepted.
const ERRCODE_ADD_ALL_INVALID: i32 = 40070;
/// `deltagusers`: none of the submitted users or departments were members.
const ERRCODE_DELETE_ALL_INVALID: i32 = 40031;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "tagid")]
    pub id: i64,
    #[serde(rename = "tagname")]
    pub name: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagUser {
    #[serde(default)]
    pub userid: String,
    #[serde(default)]
    pub name: String,
}

/// Users and departments carrying a tag.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMembers {
    pub users: Vec<TagUser>,
    pub parties: Vec<i64>,
}

/// Entries rejected by a membership change.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidMembers {
    pub users: Vec<String>,
    pub parties: Vec<i64>,
}

impl InvalidMembers {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.parties.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct TagNameRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    tagid: Option<i64>,
    tagname: &'a str,
}

#[derive(Debug, Serialize)]
struct TagMembersRequest {
    tagid: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    userlist: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    partylist: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct TagCreateResponse {
    #[serde(default)]
    tagid: i64,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

#[derive(Debug, Deserialize)]
struct TagGetResponse {
    #[serde(default)]
    userlist: Vec<TagUser>,
    #[serde(default)]
    partylist: Vec<i64>,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

#[derive(Debug, Deserialize)]
struct TagListResponse {
    #[serde(default)]
    taglist: Vec<Tag>,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

#[derive(Debug, Deserialize)]
struct TagMembersResponse {
    /// `|`-separated user ids.
    #[serde(default)]
    invalidlist: String,
    #[serde(default)]
    invalidparty: Vec<i64>,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

macro_rules! impl_api_response {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WechatApiResponse for $ty {
                fn errcode(&self) -> i32 {
                    self.errcode
                }

                fn errmsg(&self) -> &str {
                    &self.errmsg
                }
            }
        )*
    };
}

impl_api_response!(
    TagCreateResponse,
    TagGetResponse,
    TagListResponse,
    TagMembersResponse
);

/// Tag API (enterprise profile)
///
/// Every call fails with `WechatError::Config` on an account-profile client.
pub struct TagApi {
    transport: Arc<Transport>,
}

impl TagApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Tag endpoints exist only on the enterprise host.
    fn corp(&self) -> Result<&Transport, WechatError> {
        let profile = self.transport.client().profile();
        if profile != Profile::Corp {
            return Err(WechatError::Config(format!(
                "tag endpoints require the corp profile, client uses {}",
                profile.as_str()
            )));
        }
        Ok(&self.transport)
    }

    /// POST /cgi-bin/tag/create
    ///
    /// Returns the id of the new tag.
    pub async fn create(&self, name: &str) -> Result<i64, WechatError> {
        let body = TagNameRequest {
            tagid: None,
            tagname: name,
        };
        let response: TagCreateResponse = self
            .corp()?
            .post_json("/cgi-bin/tag/create?access_token=", &body)
            .await?;
        Ok(response.tagid)
    }

    /// POST /cgi-bin/tag/update
    pub async fn update(&self, id: i64, name: &str) -> Result<(), WechatError> {
        let body = TagNameRequest {
            tagid: Some(id),
            tagname: name,
        };
        let _: ApiResponseBase = self
            .corp()?
            .post_json("/cgi-bin/tag/update?access_token=", &body)
            .await?;
        Ok(())
    }

    /// GET /cgi-bin/tag/delete
    pub async fn delete(&self, id: i64) -> Result<(), WechatError> {
        let url = format!("/cgi-bin/tag/delete?tagid={id}&access_token=");
        let _: ApiResponseBase = self.corp()?.get_json(&url).await?;
        Ok(())
    }

    /// GET /cgi-bin/tag/get
    pub async fn members(&self, id: i64) -> Result<TagMembers, WechatError> {
        let url = format!("/cgi-bin/tag/get?tagid={id}&access_token=");
        let response: TagGetResponse = self.corp()?.get_json(&url).await?;
        Ok(TagMembers {
            users: response.userlist,
            parties: response.partylist,
        })
    }

    /// GET /cgi-bin/tag/list
    pub async fn list(&self) -> Result<Vec<Tag>, WechatError> {
        let response: TagListResponse = self
            .corp()?
            .get_json("/cgi-bin/tag/list?access_token=")
            .await?;
        Ok(response.taglist)
    }

    /// POST /cgi-bin/tag/addtagusers
    ///
    /// Returns the users and departments that could not be tagged. When the
    /// server rejects every entry, all inputs are reported back as invalid.
    /// Nothing is sent when both lists are empty.
    pub async fn add_users(
        &self,
        id: i64,
        users: &[String],
        parties: &[i64],
    ) -> Result<InvalidMembers, WechatError> {
        self.change_members(
            "/cgi-bin/tag/addtagusers?access_token=",
            ERRCODE_ADD_ALL_INVALID,
            id,
            users,
            parties,
        )
        .await
    }

    /// POST /cgi-bin/tag/deltagusers
    ///
    /// Same reporting rules as [`add_users`](Self::add_users).
    pub async fn delete_users(
        &self,
        id: i64,
        users: &[String],
        parties: &[i64],
    ) -> Result<InvalidMembers, WechatError> {
        self.change_members(
            "/cgi-bin/tag/deltagusers?access_token=",
            ERRCODE_DELETE_ALL_INVALID,
            id,
            users,
            parties,
        )
        .await
    }

    async fn change_members(
        &self,
        url_template: &str,
        all_invalid_code: i32,
        id: i64,
        users: &[String],
        parties: &[i64],
    ) -> Result<InvalidMembers, WechatError> {
        if users.is_empty() && parties.is_empty() {
            return Ok(InvalidMembers::default());
        }

        let body = TagMembersRequest {
            tagid: id,
            userlist: users.to_vec(),
            partylist: parties.to_vec(),
        };
        let response: TagMembersResponse =
            self.corp()?.post_json_raw(url_template, &body).await?;

        match response.errcode {
            ERRCODE_OK => Ok(InvalidMembers {
                users: split_user_list(&response.invalidlist),
                parties: response.invalidparty,
            }),
            code if code == all_invalid_code => {
                log::debug!(
                    "[Wechat] {}: every member of tag {} rejected (errcode {})",
                    self.api_name(),
                    id,
                    code
                );
                Ok(InvalidMembers {
                    users: users.to_vec(),
                    parties: parties.to_vec(),
                })
            }
            _ => {
                response.check()?;
                Ok(InvalidMembers::default())
            }
        }
    }
}

impl WechatApi for TagApi {
    fn transport(&self) -> &Transport {
        &self.transport
    }

    fn api_name(&self) -> &'static str {
        "tag"
    }
}

fn split_user_list(list: &str) -> Vec<String> {
    if list.is_empty() {
        return Vec::new();
    }
    list.split('|').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_user_list() {
        assert!(split_user_list("").is_empty());
        assert_eq!(split_user_list("zhangsan"), vec!["zhangsan"]);
        assert_eq!(split_user_list("a|b|c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_members_request_omits_empty_lists() {
        let body = TagMembersRequest {
            tagid: 3,
            userlist: vec!["zhangsan".to_string()],
            partylist: Vec::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"tagid": 3, "userlist": ["zhangsan"]}));
    }

    #[test]
    fn test_create_request_omits_id() {
        let body = TagNameRequest {
            tagid: None,
            tagname: "ops",
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"tagname":"ops"}"#);
    }

    #[test]
    fn test_tag_serde_round_trip() {
        let tag = Tag {
            id: 42,
            name: "on-call <ops> & dev".into(),
        };

        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, r#"{"tagid":42,"tagname":"on-call <ops> & dev"}"#);

        let decoded: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tag);
    }

    #[test]
    fn test_tag_list_response_decodes() {
        let json = r#"{"errcode":0,"errmsg":"ok","taglist":[{"tagid":1,"tagname":"a"}]}"#;
        let response: TagListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.taglist,
            vec![Tag {
                id: 1,
                name: "a".into()
            }]
        );
    }
}
