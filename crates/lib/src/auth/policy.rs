//! Expiry policy.
//!
//! Both checks treat an unknown expiry as already due: a token whose lifetime
//! cannot be read must be refreshed before it is trusted again.

use std::time::Duration;

/// `true` iff `now >= expiry - buffer`, or the expiry is unknown.
pub fn should_refresh(now_ms: u64, expiry_ms: Option<u64>, buffer: Duration) -> bool {
    match expiry_ms {
        Some(expiry) => now_ms >= expiry.saturating_sub(buffer.as_millis() as u64),
        None => true,
    }
}

/// `true` iff `now >= expiry`, or the expiry is unknown.
pub fn is_expired(now_ms: u64, expiry_ms: Option<u64>) -> bool {
    match expiry_ms {
        Some(expiry) => now_ms >= expiry,
        None => true,
    }
}

/// Time left until the refresh window opens, zero once it is open.
pub fn until_refresh(now_ms: u64, expiry_ms: Option<u64>, buffer: Duration) -> Duration {
    match expiry_ms {
        Some(expiry) => {
            let due = expiry.saturating_sub(buffer.as_millis() as u64);
            Duration::from_millis(due.saturating_sub(now_ms))
        }
        None => Duration::ZERO,
    }
}
