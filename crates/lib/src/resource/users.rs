//! Admin user management.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{Mutation, ResourceManager};
use crate::{
    Result,
    constants::endpoints,
    http::HttpClient,
    models::{FileRecord, UserRecord},
};

/// `GET /admin/users/` answers either shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserListing {
    Wrapped { users: Vec<UserRecord> },
    Bare(Vec<UserRecord>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FileListing {
    Wrapped { files: Vec<FileRecord> },
    Bare(Vec<FileRecord>),
}

/// A flag the admin endpoint can flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Staff,
    Active,
}

impl Flag {
    fn key(self) -> &'static str {
        match self {
            Flag::Staff => "is_staff",
            Flag::Active => "is_active",
        }
    }

    fn apply(self, user: &mut UserRecord, value: bool) {
        match self {
            Flag::Staff => user.is_staff = value,
            Flag::Active => user.is_active = Some(value),
        }
    }
}

/// Admin operations on the user list with their collection state.
#[derive(Debug, Clone)]
pub struct Users {
    http: Arc<HttpClient>,
    state: ResourceManager<UserRecord>,
}

impl Users {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            state: ResourceManager::new(),
        }
    }

    pub fn state(&self) -> &ResourceManager<UserRecord> {
        &self.state
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>> {
        self.state
            .list(async {
                let listing: UserListing =
                    self.http.get(endpoints::ADMIN_USERS).json_response().await?;
                Ok(match listing {
                    UserListing::Wrapped { users } => users,
                    UserListing::Bare(users) => users,
                })
            })
            .await
    }

    /// Grant or revoke admin rights.
    pub async fn set_admin(&self, id: u64, is_staff: bool) -> Result<()> {
        self.set_flag(id, Flag::Staff, is_staff).await
    }

    /// Flip admin rights relative to the collection's current view.
    pub async fn toggle_admin(&self, id: u64) -> Result<()> {
        let current = self.state.get(&id).is_some_and(|u| u.is_staff);
        self.set_flag(id, Flag::Staff, !current).await
    }

    /// Activate or deactivate an account.
    pub async fn set_active(&self, id: u64, is_active: bool) -> Result<()> {
        self.set_flag(id, Flag::Active, is_active).await
    }

    async fn set_flag(&self, id: u64, flag: Flag, value: bool) -> Result<()> {
        info!(id, flag = flag.key(), value, "updating user");
        self.state
            .mutate(id, async {
                let body: Value = self
                    .http
                    .patch(endpoints::admin_user(id))
                    .json(json!({ flag.key(): value }))
                    .json_response()
                    .await?;

                // Full user objects replace the row; `{status, user_id, is_staff}`
                // acknowledgements only carry the flag.
                if let Ok(user) = serde_json::from_value::<UserRecord>(body.clone()) {
                    if user.id == id {
                        return Ok(Mutation::Replace(user));
                    }
                }
                let confirmed = body
                    .get(flag.key())
                    .and_then(Value::as_bool)
                    .unwrap_or(value);
                Ok(Mutation::Patch(Box::new(move |user: &mut UserRecord| {
                    flag.apply(user, confirmed)
                })))
            })
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        info!(id, "deleting user");
        self.state
            .mutate(id, async {
                self.http
                    .delete(endpoints::admin_user_delete(id))
                    .send()
                    .await?;
                Ok(Mutation::Remove)
            })
            .await
    }

    /// Files owned by a user. Does not touch the user collection.
    pub async fn files_of(&self, id: u64) -> Result<Vec<FileRecord>> {
        let listing: FileListing = self
            .http
            .get(endpoints::admin_user_files(id))
            .json_response()
            .await?;
        Ok(match listing {
            FileListing::Wrapped { files } => files,
            FileListing::Bare(files) => files,
        })
    }

    pub fn reset(&self) {
        self.state.reset();
    }
}
