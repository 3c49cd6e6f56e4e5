//! Configuration types and loading
//!
//! Config precedence: env vars (including `.env`) > config file > defaults.
//! The client secret is loaded from AUTH0_CLIENT_SECRET or client_secret_file,
//! never stored in the TOML directly to avoid leaking secrets.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use oidc_client::{ClientConfig, DEFAULT_SCOPE, Endpoints};
use serde::Deserialize;
use url::Url;

/// Config file used when neither `--config` nor CONFIG_PATH is given.
pub const DEFAULT_CONFIG_PATH: &str = "auth-portal.toml";

/// Validated configuration
#[derive(Debug)]
pub struct Config {
    pub auth0: Auth0Config,
    pub server: ServerConfig,
}

/// Identity provider registration
#[derive(Debug)]
pub struct Auth0Config {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Provider host, e.g. `example.auth0.com`
    pub domain: String,
    pub redirect_uri: Url,
    pub scope: String,
}

impl Auth0Config {
    pub fn endpoints(&self) -> oidc_client::Result<Endpoints> {
        Endpoints::for_domain(&self.domain)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Provider request timeout. Unset means the HTTP client's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Upper bound on live sessions kept in memory
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Mark the session cookie `Secure` (set when served over https)
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
            timeout_secs: None,
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
            secure_cookie: false,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8501))
}

fn default_max_connections() -> usize {
    1000
}

fn default_session_ttl() -> u64 {
    8 * 60 * 60
}

fn default_max_sessions() -> usize {
    10_000
}

/// On-disk layout. Every provider field is optional here because env vars
/// may supply it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    auth0: Auth0File,
    #[serde(default)]
    server: ServerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Auth0File {
    client_id: Option<String>,
    domain: Option<String>,
    redirect_uri: Option<String>,
    scope: Option<String>,
    /// Path to a file containing the client secret
    client_secret_file: Option<PathBuf>,
}

/// Read a non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from an optional TOML file, then overlay environment
    /// variables.
    ///
    /// `path` is an explicitly requested file and must exist. With `None`,
    /// `DEFAULT_CONFIG_PATH` is read if present and skipped otherwise.
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let file = match path {
            Some(p) => toml::from_str(&std::fs::read_to_string(p)?)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                toml::from_str(&std::fs::read_to_string(DEFAULT_CONFIG_PATH)?)?
            }
            None => FileConfig::default(),
        };
        Self::from_file(file)
    }

    fn from_file(file: FileConfig) -> common::Result<Self> {
        let FileConfig { auth0, mut server } = file;

        let client_id = env_var("AUTH0_CLIENT_ID")
            .or(auth0.client_id)
            .filter(|v| !v.trim().is_empty())
            .ok_or(common::Error::Missing("AUTH0_CLIENT_ID"))?;

        // Client secret: env var takes precedence over file
        let client_secret = match env_var("AUTH0_CLIENT_SECRET") {
            Some(secret) => Secret::new(secret),
            None => match auth0.client_secret_file {
                Some(ref path) => {
                    let secret = std::fs::read_to_string(path).map_err(|e| {
                        common::Error::Config(format!(
                            "failed to read client_secret_file {}: {e}",
                            path.display()
                        ))
                    })?;
                    Secret::new(secret.trim().to_owned())
                }
                None => return Err(common::Error::Missing("AUTH0_CLIENT_SECRET")),
            },
        };
        if client_secret.is_blank() {
            return Err(common::Error::Missing("AUTH0_CLIENT_SECRET"));
        }

        let domain = env_var("AUTH0_DOMAIN")
            .or(auth0.domain)
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty())
            .ok_or(common::Error::Missing("AUTH0_DOMAIN"))?;
        // Validate the domain derives well-formed endpoints
        Endpoints::for_domain(&domain).map_err(|e| common::Error::Config(e.to_string()))?;

        let redirect_uri = env_var("AUTH0_REDIRECT_URI")
            .or(auth0.redirect_uri)
            .ok_or(common::Error::Missing("AUTH0_REDIRECT_URI"))?;
        let redirect_uri = Url::parse(redirect_uri.trim()).map_err(|e| {
            common::Error::Config(format!("redirect_uri is not a valid URL ({e}): {redirect_uri}"))
        })?;
        if !matches!(redirect_uri.scheme(), "http" | "https") {
            return Err(common::Error::Config(format!(
                "redirect_uri must start with http:// or https://, got: {redirect_uri}"
            )));
        }

        if let Some(addr) = env_var("LISTEN_ADDR") {
            server.listen_addr = addr.parse().map_err(|e| {
                common::Error::Config(format!("LISTEN_ADDR is not a socket address ({e}): {addr}"))
            })?;
        }

        if server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if server.max_sessions == 0 {
            return Err(common::Error::Config(
                "max_sessions must be greater than 0".into(),
            ));
        }
        if server.session_ttl_secs == 0 {
            return Err(common::Error::Config(
                "session_ttl_secs must be greater than 0".into(),
            ));
        }
        if server.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(Config {
            auth0: Auth0Config {
                client_id,
                client_secret,
                domain,
                redirect_uri,
                scope: auth0.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            },
            server,
        })
    }

    /// Resolve an explicitly requested config path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        env_var("CONFIG_PATH").map(PathBuf::from)
    }
}
