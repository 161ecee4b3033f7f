use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::response::Redirect;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::overlay::UploadTracker;
use crate::state::AppState;
use crate::views::PageView;

pub const SESSION_COOKIE: &str = "reviewguard_session";

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please enter your password")]
    MissingPassword,
    #[error("Invalid email or password")]
    WrongPassword,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything the server remembers about one signed-in browser.
#[derive(Debug)]
pub struct SessionState {
    pub session: Session,
    pub notices: Vec<Notice>,
    pub view: PageView,
    pub upload: Option<UploadTracker>,
    last_seen: Instant,
}

/// Signed-in sessions. A session left idle for longer than the store's
/// timeout is dropped the next time it is looked up or anyone signs in.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionState>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    /// Opens a session for `credentials`. When `access_password` is set the
    /// password must match it.
    pub async fn login(
        &self,
        credentials: Credentials,
        access_password: Option<&str>,
    ) -> Result<Session, LoginError> {
        let email = credentials.email.trim();
        if !email_pattern().is_match(email) {
            return Err(LoginError::InvalidEmail);
        }
        if credentials.password.is_empty() {
            return Err(LoginError::MissingPassword);
        }
        if let Some(expected) = access_password {
            if credentials.password != expected {
                return Err(LoginError::WrongPassword);
            }
        }

        let session = Session {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: Role::User,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen.elapsed() < self.idle_timeout);
        if sessions.len() < before {
            tracing::debug!("Expired {} idle sessions", before - sessions.len());
        }
        sessions.insert(
            session.id,
            SessionState {
                session: session.clone(),
                notices: Vec::new(),
                view: PageView::None,
                upload: None,
                last_seen: Instant::now(),
            },
        );
        drop(sessions);

        tracing::info!("Session opened for {}", session.email);
        Ok(session)
    }

    pub async fn logout(&self, id: Uuid) -> Option<Session> {
        let removed = self.sessions.write().await.remove(&id)?;
        tracing::info!("Session closed for {}", removed.session.email);
        Some(removed.session)
    }

    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.with(id, |s| s.session.clone()).await
    }

    /// Runs `f` against the session's state under the store lock and marks
    /// the session as active.
    pub async fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.get_mut(&id)?;
        if state.last_seen.elapsed() >= self.idle_timeout {
            if let Some(expired) = sessions.remove(&id) {
                tracing::info!("Session expired for {}", expired.session.email);
            }
            return None;
        }
        state.last_seen = Instant::now();
        Some(f(state))
    }

    pub async fn notify(&self, id: Uuid, notice: Notice) {
        self.with(id, |s| s.notices.push(notice)).await;
    }

    pub async fn take_notices(&self, id: Uuid) -> Vec<Notice> {
        self.with(id, |s| std::mem::take(&mut s.notices))
            .await
            .unwrap_or_default()
    }
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Session id carried by the request's cookie header, if any.
pub fn session_id_from_headers(headers: &axum::http::HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// Signed-in user of a dashboard request. Requests without a live session
/// are sent to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = session_id_from_headers(&parts.headers).ok_or_else(|| Redirect::to("/login"))?;
        state
            .sessions
            .get(id)
            .await
            .map(CurrentUser)
            .ok_or_else(|| Redirect::to("/login"))
    }
}
