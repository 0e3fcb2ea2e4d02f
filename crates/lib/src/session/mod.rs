//! Session lifecycle
//!
//! A session moves `anonymous → authenticating → authenticated ⇄ refreshing`
//! and back to `anonymous` on logout or an unrecoverable authorization
//! failure. [`SharedSession`] holds the state; [`SessionController`] runs the
//! operations that move it.

pub mod controller;
pub mod errors;
pub mod response;
pub mod state;

pub use controller::{Registered, SessionController};
pub use errors::SessionError;
pub use response::{AuthGrant, parse_auth_response};
pub use state::{Session, SessionEvent, SessionStatus, SharedSession};
