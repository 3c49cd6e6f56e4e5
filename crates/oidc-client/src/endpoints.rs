//! Provider endpoint derivation

use url::Url;

use crate::constants::{AUTHORIZE_PATH, TOKEN_PATH, USERINFO_PATH};
use crate::error::{Error, Result};

/// The three provider URLs used by the authorization-code flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: Url,
    pub token: Url,
    pub userinfo: Url,
}

impl Endpoints {
    /// Derive endpoints for a hosted tenant, e.g. `example.auth0.com`.
    ///
    /// The domain must be a bare host (optionally with a port); schemes and
    /// paths are rejected.
    pub fn for_domain(domain: &str) -> Result<Self> {
        let domain = domain.trim();
        if domain.is_empty() || domain.contains("://") || domain.contains('/') {
            return Err(Error::InvalidUrl(format!(
                "provider domain must be a bare host name, got: {domain:?}"
            )));
        }
        Self::from_base_url(&format!("https://{domain}"))
    }

    /// Derive endpoints under an arbitrary origin such as `http://127.0.0.1:9000`.
    pub fn from_base_url(base: &str) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| Error::InvalidUrl(format!("provider base URL {base:?}: {e}")))?;
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(Error::InvalidUrl(format!(
                "provider base URL has no host: {base}"
            )));
        }

        let join = |path: &str| {
            base.join(path)
                .map_err(|e| Error::InvalidUrl(format!("joining {path} onto {base}: {e}")))
        };

        Ok(Self {
            authorize: join(AUTHORIZE_PATH)?,
            token: join(TOKEN_PATH)?,
            userinfo: join(USERINFO_PATH)?,
        })
    }
}
