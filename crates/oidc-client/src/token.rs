//! Authorization code exchange
//!
//! POSTs the code to the provider's token endpoint. Client credentials go in
//! the Basic authorization header, and `client_id` is repeated in the form
//! body because some providers only look there.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::ClientConfig;
use crate::error::{Error, Result};

/// Token endpoint response.
///
/// Only `access_token` is required. Provider-specific fields are kept in
/// `extra` so the whole response can be stored as-is.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_type() -> String {
    String::from("Bearer")
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

/// Exchange an authorization code for tokens.
pub(crate) async fn exchange_code(
    http: &reqwest::Client,
    token_endpoint: &Url,
    config: &ClientConfig,
    code: &str,
) -> Result<TokenResponse> {
    let response = http
        .post(token_endpoint.clone())
        .basic_auth(&config.client_id, Some(config.client_secret.expose()))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let token = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;
    debug!(token_type = %token.token_type, expires_in = ?token.expires_in, "token issued");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_deserializes_minimal() {
        let json = r#"{"access_token":"at_abc"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "at_abc");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_in.is_none());
        assert!(token.extra.is_empty());
    }

    #[test]
    fn token_response_keeps_unknown_fields() {
        let json = r#"{"access_token":"at","token_type":"Bearer","expires_in":86400,"id_token":"eyJ","scope":"openid profile email","tenant":"acme"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.expires_in, Some(86400));
        assert_eq!(token.id_token.as_deref(), Some("eyJ"));
        assert_eq!(token.extra["tenant"], "acme");

        let back = serde_json::to_value(&token).unwrap();
        assert_eq!(back["tenant"], "acme");
        assert!(back.get("refresh_token").is_none());
    }

    #[test]
    fn debug_redacts_access_token() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"very-secret-token"}"#).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("very-secret-token"), "got: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
