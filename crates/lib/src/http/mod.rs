//! REST transport
//!
//! Builds requests against the configured API, attaches credentials from the
//! [`crate::store::TokenStore`], and renews them through a single-flight
//! refresh when the server answers 401.

pub mod body;
pub mod client;
pub mod errors;
mod refresh;
pub mod response;

pub use body::{ProgressFn, RequestBody, UploadPayload};
pub use client::{HttpClient, Request, RequestBuilder};
pub use errors::HttpError;
pub use response::Payload;
