//! Access-token inspection
//!
//! Decodes the expiry of access tokens and decides when they need refreshing.

pub mod claims;
pub mod errors;
pub mod policy;

pub use claims::{decode_expiry, expiry_or_unknown};
pub use errors::ClaimsError;
pub use policy::{is_expired, should_refresh, until_refresh};
