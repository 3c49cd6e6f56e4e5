//! Auth session controller
//!
//! Decides what a page view does from the visitor's session and the query
//! string, runs the matching procedure, and returns an `Outcome` for the HTTP
//! layer to execute. Procedures mutate the session passed in; they never
//! touch the store or the response directly.
//!
//! Branches, highest priority first:
//! 1. `user` in session: show the authenticated view
//! 2. `callback` marker in query: finish the login
//! 3. otherwise: start a login

use std::collections::HashMap;

use oidc_client::{OidcClient, TokenResponse, UserInfo, authorization_response_url};
use tracing::{info, instrument, warn};
use url::Url;

use crate::metrics;
use crate::session::Session;

/// Query key the redirect URI carries to mark a provider callback.
pub const CALLBACK_MARKER: &str = "callback";

/// Shown when the provider returned without `state` or `code`.
pub const INVALID_PARAMS_MESSAGE: &str = "Parâmetros inválidos retornados na autenticação.";

/// Prefix of the message shown when the exchange or user-info fetch fails.
pub const AUTH_ERROR_PREFIX: &str = "Erro na autenticação";

pub type QueryParams = HashMap<String, String>;

/// Which procedure a page view runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Authenticated,
    Callback,
    Login,
}

/// What the page shows.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Login { authorize_url: String },
    Welcome { user: UserInfo },
    Error { message: String },
}

impl View {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            View::Login { .. } => "login",
            View::Welcome { .. } => "welcome",
            View::Error { .. } => "error",
        }
    }
}

/// Result of running the controller for one page view.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Render this view in place
    Render(View),
    /// Session changed; start a fresh page view without query parameters
    Rerun,
}

/// Pick the branch for a page view. Pure: no I/O, no mutation.
pub fn select_branch(session: &Session, query: &QueryParams) -> Branch {
    if session.is_authenticated() {
        Branch::Authenticated
    } else if query.contains_key(CALLBACK_MARKER) {
        Branch::Callback
    } else {
        Branch::Login
    }
}

/// Run one page view.
pub async fn dispatch(client: &OidcClient, session: &mut Session, query: &QueryParams) -> Outcome {
    match select_branch(session, query) {
        Branch::Authenticated => welcome(session),
        Branch::Callback => callback(client, session, query).await,
        Branch::Login => login(client, session),
    }
}

/// Issue an authorization URL and remember its state.
pub fn login(client: &OidcClient, session: &mut Session) -> Outcome {
    let request = client.authorization_request();
    session.begin_login(request.state);
    metrics::record_login_started();
    info!("login link issued");
    Outcome::Render(View::Login {
        authorize_url: request.url.into(),
    })
}

/// Finish a login from the provider's redirect.
///
/// On any failure the session is left exactly as it was.
#[instrument(skip_all)]
pub async fn callback(client: &OidcClient, session: &mut Session, query: &QueryParams) -> Outcome {
    let (Some(state), Some(code)) = (query.get("state"), query.get("code")) else {
        warn!(
            has_state = query.contains_key("state"),
            has_code = query.contains_key("code"),
            "callback without state or code"
        );
        metrics::record_callback("invalid_params");
        return Outcome::Render(View::Error {
            message: INVALID_PARAMS_MESSAGE.to_string(),
        });
    };

    let response_url = authorization_response_url(&client.config().redirect_uri, code, state);

    let result = complete_login(client, session.oauth_state(), &response_url).await;
    match result {
        Ok((user, token)) => {
            info!(
                sub = user.claim("sub").unwrap_or_default(),
                "login completed"
            );
            session.establish(user, token);
            metrics::record_callback("success");
            Outcome::Rerun
        }
        Err(e) => {
            warn!(error = %e, "login failed");
            metrics::record_callback("failed");
            Outcome::Render(View::Error {
                message: format!("{AUTH_ERROR_PREFIX}: {e}"),
            })
        }
    }
}

async fn complete_login(
    client: &OidcClient,
    expected_state: Option<&str>,
    response_url: &Url,
) -> oidc_client::Result<(UserInfo, TokenResponse)> {
    let expected_state = expected_state.ok_or(oidc_client::Error::StateMismatch)?;
    let token = client.fetch_token(response_url, expected_state).await?;
    let user = client.fetch_userinfo(&token).await?;
    Ok((user, token))
}

fn welcome(session: &Session) -> Outcome {
    match session.user() {
        Some(user) => Outcome::Render(View::Welcome { user: user.clone() }),
        None => Outcome::Rerun,
    }
}

/// Forget everything about the visitor.
pub fn logout(session: &mut Session) -> Outcome {
    session.clear();
    metrics::record_logout();
    info!("logged out");
    Outcome::Rerun
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Secret;
    use oidc_client::{ClientConfig, Endpoints};

    fn client_for(endpoints: Endpoints) -> OidcClient {
        OidcClient::new(
            ClientConfig::new(
                "client-123".into(),
                Secret::new("shh".into()),
                Url::parse("http://localhost:8501/?callback=1").unwrap(),
            ),
            endpoints,
            reqwest::Client::new(),
        )
    }

    /// Client whose provider refuses connections.
    fn unreachable_client() -> OidcClient {
        client_for(Endpoints::from_base_url("http://127.0.0.1:1").unwrap())
    }

    fn query(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn authenticated_session() -> Session {
        let mut session = Session::default();
        session.establish(
            serde_json::from_str(r#"{"name":"Jane Doe"}"#).unwrap(),
            serde_json::from_str(r#"{"access_token":"at"}"#).unwrap(),
        );
        session
    }

    #[test]
    fn authenticated_session_always_wins() {
        let session = authenticated_session();
        assert_eq!(select_branch(&session, &query(&[])), Branch::Authenticated);
        assert_eq!(
            select_branch(
                &session,
                &query(&[("callback", "1"), ("state", "s"), ("code", "c")])
            ),
            Branch::Authenticated
        );
    }

    #[test]
    fn callback_marker_selects_callback() {
        let session = Session::default();
        assert_eq!(
            select_branch(&session, &query(&[("callback", "1")])),
            Branch::Callback
        );
        // state/code alone without the marker are not a callback
        assert_eq!(
            select_branch(&session, &query(&[("state", "s"), ("code", "c")])),
            Branch::Login
        );
    }

    #[test]
    fn login_stores_state_matching_url() {
        let client = client_for(Endpoints::for_domain("example.auth0.com").unwrap());
        let mut session = Session::default();

        let Outcome::Render(View::Login { authorize_url }) = login(&client, &mut session) else {
            panic!("login must render the login view");
        };
        let url = Url::parse(&authorize_url).unwrap();
        assert_eq!(url.host_str(), Some("example.auth0.com"));
        assert_eq!(url.path(), "/authorize");
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(session.oauth_state(), Some(state.as_str()));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn callback_missing_state_or_code_does_not_mutate() {
        let client = unreachable_client();
        for pairs in [
            &[("callback", "1"), ("code", "abc123")][..],
            &[("callback", "1"), ("state", "s1")][..],
            &[("callback", "1")][..],
        ] {
            let mut session = Session::default();
            session.begin_login("s1".into());

            let outcome = dispatch(&client, &mut session, &query(pairs)).await;
            assert_eq!(
                outcome,
                Outcome::Render(View::Error {
                    message: INVALID_PARAMS_MESSAGE.into()
                })
            );
            assert_eq!(session.oauth_state(), Some("s1"));
            assert!(!session.is_authenticated());
        }
    }

    #[tokio::test]
    async fn callback_network_failure_reports_detail() {
        let client = unreachable_client();
        let mut session = Session::default();
        session.begin_login("s1".into());

        let outcome = dispatch(
            &client,
            &mut session,
            &query(&[("callback", "1"), ("state", "s1"), ("code", "abc123")]),
        )
        .await;

        let Outcome::Render(View::Error { message }) = outcome else {
            panic!("expected error view, got {outcome:?}");
        };
        assert!(message.starts_with("Erro na autenticação: "), "got: {message}");
        assert!(message.contains("token exchange request failed"), "got: {message}");
        assert!(!session.is_authenticated());
        assert_eq!(session.oauth_state(), Some("s1"));
    }

    #[tokio::test]
    async fn callback_without_pending_login_is_rejected() {
        let client = unreachable_client();
        let mut session = Session::default();

        let outcome = dispatch(
            &client,
            &mut session,
            &query(&[("callback", "1"), ("state", "s1"), ("code", "abc123")]),
        )
        .await;

        let Outcome::Render(View::Error { message }) = outcome else {
            panic!("expected error view, got {outcome:?}");
        };
        assert!(message.contains("state mismatch"), "got: {message}");
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn authenticated_view_shows_user() {
        let client = unreachable_client();
        let mut session = authenticated_session();
        let outcome = dispatch(&client, &mut session, &query(&[])).await;
        let Outcome::Render(View::Welcome { user }) = outcome else {
            panic!("expected welcome view, got {outcome:?}");
        };
        assert_eq!(user.display_name(), "Jane Doe");
    }

    #[test]
    fn logout_clears_session_and_reruns() {
        let mut session = authenticated_session();
        assert_eq!(logout(&mut session), Outcome::Rerun);
        assert!(session.is_empty());
    }
}
