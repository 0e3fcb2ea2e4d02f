//! Top-level client.
//!
//! [`Client`] wires one token store, one HTTP client and the shared session
//! into the session controller and the two resource managers.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::{
    Result,
    clock::{Clock, SystemClock},
    config::ClientConfig,
    constants::endpoints,
    http::HttpClient,
    resource::{Files, Users},
    session::{SessionController, SharedSession},
    store::TokenStore,
};

/// A MyCloud client.
#[derive(Debug)]
pub struct Client {
    http: Arc<HttpClient>,
    session: SessionController,
    files: Files,
    users: Users,
}

impl Client {
    /// Create a client reading wall-clock time.
    pub fn open(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create a client with an explicit time source.
    pub fn with_clock(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        debug!(base_url = config.base_url(), "opening client");
        let http = Arc::new(HttpClient::new(config, store, SharedSession::new())?);
        Ok(Self {
            session: SessionController::new(Arc::clone(&http), clock),
            files: Files::new(Arc::clone(&http)),
            users: Users::new(Arc::clone(&http)),
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn files(&self) -> &Files {
        &self.files
    }

    /// Admin user management.
    pub fn users(&self) -> &Users {
        &self.users
    }

    /// Log out and forget every loaded collection.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.files.reset();
        self.users.reset();
    }

    /// Check `/health/` without credentials.
    pub async fn health(&self) -> Result<Value> {
        self.http
            .get(endpoints::HEALTH)
            .anonymous()
            .json_response()
            .await
    }
}
