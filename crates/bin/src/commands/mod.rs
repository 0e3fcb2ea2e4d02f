//! Subcommand implementations.

use mycloud::{Client, UserProfile, session::SessionStatus};

pub mod admin;
pub mod auth;
pub mod files;
pub mod health;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Restore the stored session, refreshing it if due, and return its user.
pub async fn require_session(client: &Client) -> Result<UserProfile, Box<dyn std::error::Error>> {
    let session = client.session().check_auth_status().await;
    match (session.status, session.user) {
        (SessionStatus::Authenticated, Some(user)) => Ok(user),
        _ => Err(match session.error {
            Some(reason) => format!("not logged in ({reason}); run `mycloud login`").into(),
            None => "not logged in; run `mycloud login`".into(),
        }),
    }
}
