//! Rows stored in the `phones` and `calls` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, Result};

/// Telegram user identifier.
pub type UserId = i64;

/// A phone number a user shared with the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneRegistration {
    pub id: i64,
    pub user_id: UserId,
    /// Provider-specific format, never validated locally.
    pub phone: String,
}

/// A time span during which the owner's phone may be called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallWindow {
    pub id: i64,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CallWindow {
    /// A window is open while `at` is strictly before its expiry.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at > at
    }

    pub fn duration(&self) -> chrono::Duration {
        self.expires_at - self.created_at
    }
}

/// Timestamps are stored as Unix nanoseconds so comparisons in SQL match
/// `DateTime` comparisons exactly. Representable range is 1677 to 2262.
pub(crate) fn dt_to_nanos(dt: DateTime<Utc>) -> Result<i64> {
    dt.timestamp_nanos_opt()
        .ok_or_else(|| PersistenceError::InvalidData(format!("timestamp out of range: {}", dt)))
}

pub(crate) fn nanos_to_dt(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}
