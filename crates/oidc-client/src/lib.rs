//! OAuth2 / OpenID Connect authorization-code client
//!
//! Everything the auth portal needs to talk to a hosted identity provider,
//! with no dependency on the web layer:
//!
//! 1. `Endpoints::for_domain()` derives the authorize/token/userinfo URLs
//! 2. `OidcClient::authorization_request()` builds the login URL and a fresh state
//! 3. The provider redirects back with `code` and `state`
//! 4. `authorization_response_url()` rebuilds the callback URL from those values
//! 5. `OidcClient::fetch_token()` validates the state and exchanges the code
//! 6. `OidcClient::fetch_userinfo()` loads the identity claims with the access token

pub mod callback;
pub mod client;
pub mod constants;
pub mod endpoints;
pub mod error;
pub mod state;
pub mod token;
pub mod userinfo;

pub use callback::{authorization_response_url, parse_authorization_response};
pub use client::{AuthorizationRequest, ClientConfig, OidcClient};
pub use constants::DEFAULT_SCOPE;
pub use endpoints::Endpoints;
pub use error::{Error, Result};
pub use state::generate_state;
pub use token::TokenResponse;
pub use userinfo::UserInfo;
