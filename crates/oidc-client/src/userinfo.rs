//! OIDC user-info retrieval

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::token::TokenResponse;

/// Identity claims returned by the user-info endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserInfo(serde_json::Map<String, serde_json::Value>);

impl UserInfo {
    pub fn new(claims: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(claims)
    }

    pub fn claims(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    /// String value of a single claim, if present and a string.
    pub fn claim(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Name to greet the user with.
    ///
    /// Falls back through `nickname`, `email` and `sub` when the provider
    /// omits `name`.
    pub fn display_name(&self) -> &str {
        ["name", "nickname", "email", "sub"]
            .iter()
            .find_map(|key| self.claim(key).filter(|v| !v.is_empty()))
            .unwrap_or("")
    }

    /// Claims as indented JSON for display.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Fetch the user-info resource with the access token.
pub(crate) async fn fetch_userinfo(
    http: &reqwest::Client,
    userinfo_endpoint: &Url,
    token: &TokenResponse,
) -> Result<UserInfo> {
    let response = http
        .get(userinfo_endpoint.clone())
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|e| Error::Http(format!("userinfo request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::UserInfo(format!(
            "userinfo endpoint returned {status}: {body}"
        )));
    }

    let user = response
        .json::<UserInfo>()
        .await
        .map_err(|e| Error::UserInfo(format!("invalid userinfo response: {e}")))?;
    debug!(claims = user.claims().len(), "userinfo received");
    Ok(user)
}
