//! Error types for OIDC client operations

/// Errors from the authorization-code flow.
///
/// Every variant carries the underlying detail so callers can show it to the
/// visitor unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("userinfo request failed: {0}")]
    UserInfo(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("missing parameter in authorization response: {0}")]
    MissingParameter(&'static str),

    #[error("state mismatch: authorization response does not belong to this login")]
    StateMismatch,
}

/// Result alias for OIDC client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_detail() {
        let err = Error::TokenExchange("token endpoint returned 403 Forbidden: denied".into());
        assert!(err.to_string().contains("403 Forbidden"));
        assert_eq!(
            Error::MissingParameter("code").to_string(),
            "missing parameter in authorization response: code"
        );
    }
}
