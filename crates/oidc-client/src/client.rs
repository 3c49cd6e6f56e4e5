//! Client bound to one application registration at one provider

use common::Secret;
use tracing::{info, instrument};
use url::Url;

use crate::callback::parse_authorization_response;
use crate::constants::DEFAULT_SCOPE;
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::state::generate_state;
use crate::token::{TokenResponse, exchange_code};
use crate::userinfo::{UserInfo, fetch_userinfo};

/// Application registration at the provider.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Callback URL registered with the provider
    pub redirect_uri: Url,
    /// Space-separated scopes
    pub scope: String,
}

impl ClientConfig {
    pub fn new(client_id: String, client_secret: Secret<String>, redirect_uri: Url) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// Authorization URL plus the state value embedded in it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Authorization-code flow client.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct OidcClient {
    config: ClientConfig,
    endpoints: Endpoints,
    http: reqwest::Client,
}

impl OidcClient {
    pub fn new(config: ClientConfig, endpoints: Endpoints, http: reqwest::Client) -> Self {
        Self {
            config,
            endpoints,
            http,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Build the authorization URL with a fresh state. No network I/O.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let state = generate_state();
        let mut url = self.endpoints.authorize.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &self.config.scope)
            .append_pair("state", &state);
        AuthorizationRequest { url, state }
    }

    /// Validate a callback URL against `expected_state` and exchange its code.
    #[instrument(skip_all, fields(token_endpoint = %self.endpoints.token))]
    pub async fn fetch_token(
        &self,
        authorization_response: &Url,
        expected_state: &str,
    ) -> Result<TokenResponse> {
        let code = parse_authorization_response(authorization_response, expected_state)?;
        let token = exchange_code(&self.http, &self.endpoints.token, &self.config, &code).await?;
        info!("authorization code exchanged");
        Ok(token)
    }

    /// Load the identity claims for an access token.
    #[instrument(skip_all, fields(userinfo_endpoint = %self.endpoints.userinfo))]
    pub async fn fetch_userinfo(&self, token: &TokenResponse) -> Result<UserInfo> {
        fetch_userinfo(&self.http, &self.endpoints.userinfo, token).await
    }
}
