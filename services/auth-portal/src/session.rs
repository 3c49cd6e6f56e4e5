//! Per-visitor session state
//!
//! Each browser gets a random session id in an HttpOnly cookie. The store
//! keeps sessions in memory only; a restart logs everyone out. An idle
//! session expires on its next lookup, and the whole map is swept at most
//! once a minute. The store holds at most `max_sessions` entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum_extra::extract::cookie::{Cookie, SameSite};
use oidc_client::{TokenResponse, UserInfo};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "auth_portal_session";

/// State for one visitor.
///
/// `user` and `token` are only ever set together through `establish`, so a
/// present `user` always means a completed login.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<UserInfo>,
    token: Option<TokenResponse>,
    oauth_state: Option<String>,
}

impl Session {
    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&TokenResponse> {
        self.token.as_ref()
    }

    /// State value of the login currently awaiting its callback.
    pub fn oauth_state(&self) -> Option<&str> {
        self.oauth_state.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.token.is_none() && self.oauth_state.is_none()
    }

    /// Remember the state of a freshly issued authorization URL.
    pub fn begin_login(&mut self, state: String) {
        self.oauth_state = Some(state);
    }

    /// Record a completed login. The pending state is consumed.
    pub fn establish(&mut self, user: UserInfo, token: TokenResponse) {
        self.user = Some(user);
        self.token = Some(token);
        self.oauth_state = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().as_simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimum time between full sweeps for idle sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    session: Session,
    last_seen: Instant,
}

struct Inner {
    entries: HashMap<SessionId, Entry>,
    last_sweep: Instant,
}

impl Inner {
    fn sweep(&mut self, ttl: Duration) {
        self.entries.retain(|_, e| e.last_seen.elapsed() < ttl);
        self.last_sweep = Instant::now();
    }
}

/// In-memory session store shared by all handlers.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            ttl,
            max_sessions,
        }
    }

    /// Look up the visitor's session, creating an empty one on first visit.
    ///
    /// Unknown or expired ids are never adopted; the visitor gets a new id.
    /// At capacity the least recently seen session is evicted.
    pub async fn load_or_create(&self, id: Option<&str>) -> (SessionId, Session) {
        let mut inner = self.inner.lock().await;
        if inner.last_sweep.elapsed() >= SWEEP_INTERVAL {
            inner.sweep(self.ttl);
        }

        if let Some(id) = id {
            let id = SessionId(id.to_owned());
            let live = inner
                .entries
                .get(&id)
                .map(|e| e.last_seen.elapsed() < self.ttl);
            match live {
                Some(true) => {
                    if let Some(entry) = inner.entries.get_mut(&id) {
                        entry.last_seen = Instant::now();
                        return (id, entry.session.clone());
                    }
                }
                Some(false) => {
                    inner.entries.remove(&id);
                }
                None => {}
            }
        }

        if inner.entries.len() >= self.max_sessions {
            inner.sweep(self.ttl);
        }
        if inner.entries.len() >= self.max_sessions {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
                warn!(
                    max_sessions = self.max_sessions,
                    "session store full, evicted least recently seen session"
                );
            }
        }

        let id = SessionId::generate();
        inner.entries.insert(
            id.clone(),
            Entry {
                session: Session::default(),
                last_seen: Instant::now(),
            },
        );
        debug!(sessions = inner.entries.len(), "session created");
        (id, Session::default())
    }

    /// Write back a session after the controller ran.
    ///
    /// Only a session that still exists is updated. Returns false when it was
    /// destroyed or evicted in the meantime, in which case nothing is stored.
    pub async fn save(&self, id: &SessionId, session: Session) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.entries.get_mut(id) {
            Some(entry) => {
                entry.session = session;
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drop a session entirely. Returns whether it existed.
    pub async fn destroy(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let removed = inner.entries.remove(&SessionId(id.to_owned())).is_some();
        if removed {
            debug!(sessions = inner.entries.len(), "session destroyed");
        }
        removed
    }

    /// Number of live sessions, for the health endpoint.
    pub async fn active_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner
            .entries
            .values()
            .filter(|e| e.last_seen.elapsed() < self.ttl)
            .count()
    }

    #[cfg(test)]
    pub async fn get(&self, id: &str) -> Option<Session> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(&SessionId(id.to_owned()))
            .map(|e| e.session.clone())
    }
}

/// Cookie carrying the session id.
pub fn session_cookie(id: &SessionId, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that tells the browser to forget the session id.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
