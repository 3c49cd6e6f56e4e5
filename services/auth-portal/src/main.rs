//! Auth Portal
//!
//! Single-binary Rust service that:
//! 1. Sends visitors to a hosted identity provider to log in
//! 2. Completes the authorization-code flow on the callback
//! 3. Shows the logged-in user's profile with a logout button

mod config;
mod controller;
mod error;
mod metrics;
mod render;
mod session;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum_extra::extract::cookie::CookieJar;
use metrics_exporter_prometheus::PrometheusHandle;
use oidc_client::OidcClient;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::controller::{Outcome, QueryParams};
use crate::render::Renderer;
use crate::session::{SESSION_COOKIE, SessionStore, removal_cookie, session_cookie};

/// Time allowed for in-flight requests to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    client: OidcClient,
    sessions: SessionStore,
    renderer: Renderer,
    secure_cookie: bool,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/logout", post(logout_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Log filter from `LOG_LEVEL`, then `RUST_LOG`, defaulting to `info`.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so LOG_LEVEL / RUST_LOG from it reach the filter below
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting auth-portal");

    if let Some(path) = dotenv_path {
        info!(path = %path.display(), "loaded .env");
    }

    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    let config = Config::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(p) => format!("failed to load config from {}", p.display()),
        None => String::from("failed to load config"),
    })?;

    info!(
        listen_addr = %config.server.listen_addr,
        domain = %config.auth0.domain,
        redirect_uri = %config.auth0.redirect_uri,
        scope = %config.auth0.scope,
        "configuration loaded"
    );

    let mut http = reqwest::Client::builder();
    if let Some(timeout) = config.server.timeout() {
        http = http.timeout(timeout);
    }
    let http = http.build().context("failed to build HTTP client")?;

    let endpoints = config
        .auth0
        .endpoints()
        .context("failed to derive provider endpoints")?;
    let client = OidcClient::new(config.auth0.client_config(), endpoints, http);

    let app_state = AppState {
        client,
        sessions: SessionStore::new(config.server.session_ttl(), config.server.max_sessions),
        renderer: Renderer::new().context("failed to compile page template")?,
        secure_cookie: config.server.secure_cookie,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    // Drain timer starts at signal receipt, not at server start
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// GET / — run the controller for this visitor.
async fn page_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<QueryParams>,
) -> Response {
    let cookie_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned());
    let (session_id, mut session) = state.sessions.load_or_create(cookie_id.as_deref()).await;

    let outcome = controller::dispatch(&state.client, &mut session, &query).await;
    debug!(
        authenticated = session.is_authenticated(),
        has_token = session.token().is_some(),
        "page view handled"
    );
    if !state.sessions.save(&session_id, session).await {
        warn!("session ended while the page view was running");
        return (jar.remove(removal_cookie()), Redirect::to("/")).into_response();
    }

    let jar = jar.add(session_cookie(&session_id, state.secure_cookie));
    match outcome {
        Outcome::Rerun => (jar, Redirect::to("/")).into_response(),
        Outcome::Render(view) => match state.renderer.render(&view) {
            Ok(html) => {
                metrics::record_page(view.kind());
                (jar, Html(html)).into_response()
            }
            Err(e) => {
                error!(error = %e, view = view.kind(), "failed to render page");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
            }
        },
    }
}

/// POST /logout — clear and destroy the visitor's session.
async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()) {
        let (session_id, mut session) = state.sessions.load_or_create(Some(id.as_str())).await;
        if session.is_empty() {
            debug!("logout without an active login");
        }
        let outcome = controller::logout(&mut session);
        state.sessions.destroy(session_id.as_str()).await;
        debug!(?outcome, "session destroyed");
    }

    (jar.remove(removal_cookie()), Redirect::to("/")).into_response()
}

/// Health endpoint: status, uptime, live sessions.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "active_sessions": state.sessions.active_count().await,
    });

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint — returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
