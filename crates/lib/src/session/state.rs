//! Session state and its transitions.
//!
//! [`SharedSession`] is the single owner of the in-memory [`Session`]. Every
//! transition goes through one of its methods, which keeps the invariant that
//! tokens are present exactly when the status is `Authenticated` or
//! `Refreshing`, and publishes a [`SessionEvent`] for the transitions other
//! parts of an application care about.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::errors::SessionError;
use crate::models::{TokenPair, UserProfile};

const EVENT_CAPACITY: usize = 16;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

impl SessionStatus {
    /// Whether a session in this status holds tokens.
    pub fn has_tokens(self) -> bool {
        matches!(self, SessionStatus::Authenticated | SessionStatus::Refreshing)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Anonymous => "anonymous",
            SessionStatus::Authenticating => "authenticating",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Refreshing => "refreshing",
        };
        f.write_str(name)
    }
}

/// Notifications published on session transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login, registration or startup check produced a session.
    Authenticated { user_id: Option<u64> },
    /// The access token was renewed.
    Refreshed { expiry_epoch_ms: Option<u64> },
    /// The session was destroyed by a refresh failure or a rejected retry.
    Expired { reason: String },
    /// The user logged out.
    LoggedOut,
}

/// Snapshot of the session.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: Option<TokenPair>,
    /// Access-token expiry, `None` when it could not be decoded.
    pub expiry_epoch_ms: Option<u64>,
    pub user: Option<UserProfile>,
    pub status: SessionStatus,
    /// Last session-level error, cleared when the next login starts.
    pub error: Option<String>,
    /// Bumped whenever the session is installed or torn down.
    generation: u64,
}

impl Session {
    fn anonymous() -> Self {
        Self {
            tokens: None,
            expiry_epoch_ms: None,
            user: None,
            status: SessionStatus::Anonymous,
            error: None,
            generation: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status.has_tokens()
    }

    fn clear(&mut self) {
        self.tokens = None;
        self.expiry_epoch_ms = None;
        self.user = None;
        self.status = SessionStatus::Anonymous;
        self.generation += 1;
    }
}

/// Session state shared between the HTTP client and the controller.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSession")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Default for SharedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Session::anonymous())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn expiry(&self) -> Option<u64> {
        self.lock().expiry_epoch_ms
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Subscribe to session events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Enter `Authenticating` from `Anonymous`, clearing the previous error.
    ///
    /// An existing session is discarded first; a login already in flight is
    /// rejected.
    pub fn begin_authenticating(&self) -> Result<(), SessionError> {
        let mut session = self.lock();
        if session.status == SessionStatus::Authenticating {
            return Err(SessionError::AuthenticationInProgress);
        }
        session.clear();
        session.error = None;
        session.status = SessionStatus::Authenticating;
        debug!("session authenticating");
        Ok(())
    }

    /// Install a fresh session.
    pub fn authenticated(
        &self,
        tokens: TokenPair,
        expiry_epoch_ms: Option<u64>,
        user: Option<UserProfile>,
    ) {
        let user_id = user.as_ref().map(|u| u.id);
        {
            let mut session = self.lock();
            session.tokens = Some(tokens);
            session.expiry_epoch_ms = expiry_epoch_ms;
            session.user = user;
            session.status = SessionStatus::Authenticated;
            session.error = None;
            session.generation += 1;
        }
        info!(user_id, expiry = ?expiry_epoch_ms, "session authenticated");
        self.publish(SessionEvent::Authenticated { user_id });
    }

    /// Mark a renewal as started and return the generation it belongs to.
    /// Only an authenticated session moves to `Refreshing`.
    pub fn begin_refresh(&self) -> u64 {
        let mut session = self.lock();
        if session.status == SessionStatus::Authenticated {
            session.status = SessionStatus::Refreshing;
        }
        session.generation
    }

    /// Commit renewed tokens taken under `generation`.
    ///
    /// `persist` runs while the session is locked, so a logout or expiry
    /// either happens before it (the pair is discarded and `Ok(false)` is
    /// returned) or after it (and clears what was written). A session that
    /// is not holding tokens yet, as during the startup check, only gets the
    /// pair persisted; the caller installs it.
    pub fn refreshed<E>(
        &self,
        generation: u64,
        tokens: &TokenPair,
        expiry_epoch_ms: Option<u64>,
        persist: impl FnOnce(&TokenPair) -> Result<(), E>,
    ) -> Result<bool, E> {
        {
            let mut session = self.lock();
            if session.generation != generation {
                debug!("session changed during refresh, discarding tokens");
                return Ok(false);
            }
            if let Err(err) = persist(tokens) {
                if session.status == SessionStatus::Refreshing {
                    session.status = SessionStatus::Authenticated;
                }
                return Err(err);
            }
            if !session.status.has_tokens() {
                return Ok(true);
            }
            session.tokens = Some(tokens.clone());
            session.expiry_epoch_ms = expiry_epoch_ms;
            session.status = SessionStatus::Authenticated;
        }
        debug!(expiry = ?expiry_epoch_ms, "session tokens refreshed");
        self.publish(SessionEvent::Refreshed { expiry_epoch_ms });
        Ok(true)
    }

    /// Replace the cached profile only. Ignored once the session is gone.
    pub fn set_user(&self, user: UserProfile) {
        let mut session = self.lock();
        if session.status != SessionStatus::Anonymous {
            session.user = Some(user);
        }
    }

    /// Destroy the session after an unrecoverable authorization failure.
    pub fn expire(&self, reason: impl Into<String>) {
        let reason = reason.into();
        {
            let mut session = self.lock();
            session.clear();
            session.error = Some(reason.clone());
        }
        warn!(%reason, "session expired");
        self.publish(SessionEvent::Expired { reason });
    }

    /// Destroy the session on explicit logout.
    pub fn logged_out(&self) {
        {
            let mut session = self.lock();
            session.clear();
            session.error = None;
        }
        info!("session logged out");
        self.publish(SessionEvent::LoggedOut);
    }

    /// A login, registration or startup check failed; land in `Anonymous`
    /// with `message` as the session error.
    pub fn failed(&self, message: impl Into<String>) {
        let mut session = self.lock();
        session.clear();
        session.error = Some(message.into());
    }

    /// Land in `Anonymous` without recording an error.
    pub fn reset(&self) {
        let mut session = self.lock();
        session.clear();
        session.error = None;
    }
}
