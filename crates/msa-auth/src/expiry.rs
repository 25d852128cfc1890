//! Token lifetime helpers over UTC epoch seconds.

use chrono::Utc;

/// Epoch second `expires_in` seconds from now
pub fn to_expires_at(expires_in: i64) -> i64 {
    Utc::now().timestamp() + expires_in
}

/// Whether `expires_at` lies in the past. The boundary second itself is
/// still valid.
pub fn expired(expires_at: i64) -> bool {
    expired_at(Utc::now().timestamp(), expires_at)
}

fn expired_at(now: i64, expires_at: i64) -> bool {
    now > expires_at
}
