//! Resource state managers
//!
//! [`ResourceManager`] is generic over the entity type; [`Files`] and
//! [`Users`] bind it to the file and admin user endpoints and normalize the
//! response shapes those endpoints produce.

use std::{fmt, hash::Hash};

use crate::models::{FileRecord, UserRecord};

pub mod files;
mod in_flight;
pub mod manager;
pub mod users;

pub use files::Files;
pub use manager::{CollectionSnapshot, Mutation, ResourceManager};
pub use users::Users;

/// An entity kept in a [`ResourceManager`].
pub trait Resource: Clone + fmt::Debug + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

impl Resource for FileRecord {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

impl Resource for UserRecord {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}
