//! Session controller.
//!
//! Drives the session through login, registration, the startup check,
//! proactive refresh and logout. State lives in the [`SharedSession`] owned by
//! the HTTP client, so a refresh triggered by any request is visible here.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::json;
use tokio::{sync::broadcast, task::AbortHandle};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::{
    errors::SessionError,
    response::{AuthGrant, parse_auth_response},
    state::{Session, SessionEvent, SessionStatus, SharedSession},
};
use crate::{
    Result,
    auth::{self, expiry_or_unknown},
    clock::Clock,
    constants::endpoints,
    http::HttpClient,
    models::{Credentials, Registration, TokenPair, UserProfile},
    store::TokenStore,
    validation::validate_registration,
};

/// What a successful registration produced.
#[derive(Debug)]
pub enum Registered {
    /// The server returned tokens and the new user is logged in.
    LoggedIn(Session),
    /// The account exists; the user still has to log in.
    AccountCreated,
}

/// Owner of the authentication state machine.
#[derive(Debug)]
pub struct SessionController {
    http: Arc<HttpClient>,
    clock: Arc<dyn Clock>,
    refresh_task: Mutex<Option<AbortHandle>>,
}

impl SessionController {
    pub fn new(http: Arc<HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            clock,
            refresh_task: Mutex::new(None),
        }
    }

    fn shared(&self) -> &SharedSession {
        self.http.session()
    }

    fn store(&self) -> &Arc<dyn TokenStore> {
        self.http.store()
    }

    pub fn session(&self) -> Session {
        self.shared().snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.shared().status()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.shared().user()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared().subscribe()
    }

    /// Log in with a username and password.
    ///
    /// On failure the session is anonymous and its error holds the server's
    /// message unchanged.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.shared().begin_authenticating()?;
        info!(username = %credentials.username, "logging in");

        let result = async {
            let body = self
                .http
                .post(endpoints::LOGIN)
                .anonymous()
                .json(json!({
                    "username": credentials.username,
                    "password": credentials.password,
                }))
                .json_response()
                .await?;
            let grant =
                parse_auth_response(body).ok_or_else(|| SessionError::MalformedAuthResponse {
                    reason: "login response carried no tokens".to_string(),
                })?;
            self.establish(grant).await
        }
        .await;

        self.settle(result)
    }

    /// Create an account, logging in when the server hands back tokens.
    ///
    /// The form is validated first; an invalid form never reaches the
    /// network and leaves the session untouched.
    pub async fn register(&self, registration: &Registration) -> Result<Registered> {
        validate_registration(registration)?;
        self.shared().begin_authenticating()?;
        info!(username = %registration.username, "registering");

        let result = async {
            let body = self
                .http
                .post(endpoints::REGISTER)
                .anonymous()
                .json(serde_json::to_value(registration)?)
                .json_response()
                .await?;
            match parse_auth_response(body) {
                Some(grant) => self.establish(grant).await.map(Registered::LoggedIn),
                None => {
                    debug!("registration returned no tokens");
                    self.shared().reset();
                    Ok(Registered::AccountCreated)
                }
            }
        }
        .await;

        self.settle(result)
    }

    /// Restore a stored session at startup.
    ///
    /// Refreshes first when the stored token is inside the refresh window and
    /// fetches the profile when none is cached. Any failure clears the stored
    /// session; the reason is kept as the session error.
    pub async fn check_auth_status(&self) -> Session {
        if self.shared().begin_authenticating().is_err() {
            return self.session();
        }

        let result = async {
            let Some(mut tokens) = self.store().load()? else {
                debug!("no stored session");
                self.shared().reset();
                return Ok(None);
            };

            let mut expiry = expiry_or_unknown(&tokens.access);
            if auth::should_refresh(
                self.clock.now_millis(),
                expiry,
                self.http.config().refresh_buffer(),
            ) {
                debug!(expiry = ?expiry, "stored token due for refresh");
                tokens = self.http.refresh_once(None).await?;
                expiry = expiry_or_unknown(&tokens.access);
            }

            let user = match self.store().load_user()? {
                Some(user) => user,
                None => self.request_profile().await?,
            };
            Ok::<_, crate::Error>(Some((tokens, expiry, user)))
        }
        .await;

        match result {
            Ok(Some((tokens, expiry, user))) => {
                self.store_user(&user);
                self.shared().authenticated(tokens, expiry, Some(user));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "stored session could not be restored");
                self.shared().failed(err.to_string());
                self.clear_store();
            }
        }
        self.session()
    }

    /// End the session.
    ///
    /// The server is asked to invalidate the refresh token; if that fails the
    /// failure is logged and the local session is cleared anyway.
    pub async fn logout(&self) {
        self.stop_refresh_task();

        match self.store().load() {
            Ok(Some(tokens)) => {
                let result = self
                    .http
                    .post(endpoints::LOGOUT)
                    .json(json!({ "refresh": tokens.refresh }))
                    .send()
                    .await;
                if let Err(err) = result {
                    warn!(error = %err, "server-side logout failed");
                }
            }
            Ok(None) => debug!("logout without stored tokens"),
            Err(err) => warn!(error = %err, "could not read stored tokens for logout"),
        }

        // Before the store clear, so a refresh still in flight drops its tokens.
        self.shared().logged_out();
        self.clear_store();
    }

    /// Fetch the current user's profile and cache it.
    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        let user = self.request_profile().await?;
        self.store().save_user(&user)?;
        self.shared().set_user(user.clone());
        Ok(user)
    }

    /// Renew the access token now, sharing any refresh already in flight.
    pub async fn refresh(&self) -> Result<TokenPair> {
        self.http.refresh_once(None).await
    }

    /// Whether the current access token is inside the refresh window.
    pub fn should_refresh(&self) -> bool {
        auth::should_refresh(
            self.clock.now_millis(),
            self.shared().expiry(),
            self.http.config().refresh_buffer(),
        )
    }

    /// Whether the current access token has expired. An unknown expiry counts
    /// as expired.
    pub fn is_expired(&self) -> bool {
        auth::is_expired(self.clock.now_millis(), self.shared().expiry())
    }

    /// Refresh in the background whenever the token enters its refresh window.
    ///
    /// The task stops on logout, on session expiry, on a failed refresh, and
    /// when a renewed token's expiry cannot be scheduled. Spawning again
    /// replaces a running task.
    pub fn spawn_refresh_task(&self) {
        let http = Arc::clone(&self.http);
        let clock = Arc::clone(&self.clock);
        let mut events = self.shared().subscribe();

        let task = tokio::spawn(
            async move {
                let buffer = http.config().refresh_buffer();
                loop {
                    let session = http.session().snapshot();
                    if !session.is_authenticated() {
                        debug!("no session, stopping");
                        break;
                    }

                    let wait = auth::until_refresh(clock.now_millis(), session.expiry_epoch_ms, buffer);
                    if !wait.is_zero() {
                        debug!(wait_ms = wait.as_millis() as u64, "sleeping until refresh window");
                        tokio::select! {
                            _ = tokio::time::sleep(wait) => {}
                            event = events.recv() => match event {
                                Ok(SessionEvent::LoggedOut | SessionEvent::Expired { .. })
                                | Err(broadcast::error::RecvError::Closed) => break,
                                _ => {}
                            },
                        }
                        continue;
                    }

                    if let Err(err) = http.refresh_once(None).await {
                        warn!(error = %err, "proactive refresh failed, stopping");
                        break;
                    }
                    let expiry = http.session().expiry();
                    if auth::until_refresh(clock.now_millis(), expiry, buffer) == Duration::ZERO {
                        warn!(expiry = ?expiry, "renewed token is already due, stopping");
                        break;
                    }
                }
            }
            .instrument(info_span!("refresh_task")),
        );

        let previous = self
            .refresh_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Stop the background refresh task, if any.
    pub fn stop_refresh_task(&self) {
        let handle = self
            .refresh_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    async fn request_profile(&self) -> Result<UserProfile> {
        self.http
            .get(endpoints::CURRENT_USER)
            .json_response()
            .await
    }

    /// Persist a grant and declare the session authenticated.
    async fn establish(&self, grant: AuthGrant) -> Result<Session> {
        let AuthGrant { tokens, user } = grant;
        self.store().save(&tokens)?;
        let user = match user {
            Some(user) => user,
            None => self.request_profile().await?,
        };
        self.store_user(&user);

        let expiry = expiry_or_unknown(&tokens.access);
        self.shared().authenticated(tokens, expiry, Some(user));
        Ok(self.session())
    }

    /// Record a failed login or registration.
    fn settle<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(error = %err, "authentication failed");
            self.shared().failed(err.to_string());
            self.clear_store();
        }
        result
    }

    fn store_user(&self, user: &UserProfile) {
        if let Err(err) = self.store().save_user(user) {
            warn!(error = %err, "could not cache user profile");
        }
    }

    fn clear_store(&self) {
        if let Err(err) = self.store().clear() {
            error!(error = %err, "could not clear token store");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop_refresh_task();
    }
}
