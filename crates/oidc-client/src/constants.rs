//! Provider path and scope constants

/// Scopes requested on every login.
pub const DEFAULT_SCOPE: &str = "openid profile email";

/// Authorization endpoint path, relative to the provider origin
pub const AUTHORIZE_PATH: &str = "/authorize";

/// Token endpoint path for the code exchange
pub const TOKEN_PATH: &str = "/oauth/token";

/// OIDC user-info endpoint path
pub const USERINFO_PATH: &str = "/userinfo";
