//! Integration profiles.
//!
//! Corp (enterprise) and account (official account) integrations share one
//! transport; they differ only in host and credential-issuance endpoints.

/// Which WeChat integration a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    /// Enterprise WeChat (`qyapi.weixin.qq.com`), identified by corpid/corpsecret.
    Corp,
    /// Official account (`api.weixin.qq.com`), identified by appid/secret.
    #[default]
    Account,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Corp => "corp",
            Profile::Account => "account",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Profile::Corp => "https://qyapi.weixin.qq.com",
            Profile::Account => "https://api.weixin.qq.com",
        }
    }

    pub(crate) fn token_path(&self) -> &'static str {
        match self {
            Profile::Corp => "/cgi-bin/gettoken",
            Profile::Account => "/cgi-bin/token",
        }
    }

    pub(crate) fn token_query<'a>(
        &self,
        appid: &'a str,
        secret: &'a str,
    ) -> Vec<(&'static str, &'a str)> {
        match self {
            Profile::Corp => vec![("corpid", appid), ("corpsecret", secret)],
            Profile::Account => vec![
                ("grant_type", "client_credential"),
                ("appid", appid),
                ("secret", secret),
            ],
        }
    }

    /// URL template of the jsapi ticket endpoint; the token is appended last.
    pub(crate) fn ticket_url(&self) -> &'static str {
        match self {
            Profile::Corp => "/cgi-bin/get_jsapi_ticket?access_token=",
            Profile::Account => "/cgi-bin/ticket/getticket?type=jsapi&access_token=",
        }
    }
}
