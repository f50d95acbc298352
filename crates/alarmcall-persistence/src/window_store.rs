//! Append-only log of call windows and the eligibility query.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::database::Database;
use crate::error::{PersistenceError, Result};
use crate::models::{dt_to_nanos, nanos_to_dt, CallWindow, UserId};

/// Stores call windows and answers "whom may we call right now".
///
/// Windows are never updated or deleted; expiry is decided at query time.
#[derive(Clone)]
pub struct CallWindowStore {
    db: Database,
}

impl CallWindowStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends a window. Overlapping windows for the same user accumulate.
    pub fn open_window(
        &self,
        user_id: UserId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<CallWindow> {
        let created = dt_to_nanos(created_at)?;
        let expired = dt_to_nanos(expires_at)?;
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO calls (user_id, date_created, date_expired) VALUES (?1, ?2, ?3)",
                params![user_id, created, expired],
            )
            .map_err(PersistenceError::sqlite("insert call window"))?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!(user_id = %user_id, expires_at = %expires_at, "Call window opened");
        Ok(CallWindow {
            id,
            user_id,
            created_at,
            expires_at,
        })
    }

    /// Opens a window of `hours` starting at `now`.
    pub fn open_for_hours(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        hours: u32,
    ) -> Result<CallWindow> {
        self.open_window(user_id, now, now + Duration::hours(i64::from(hours)))
    }

    /// Distinct phones whose owners hold a window expiring strictly after `at`.
    ///
    /// Users with a window but no registered phone contribute nothing.
    pub fn phones_eligible_at(&self, at: DateTime<Utc>) -> Result<BTreeSet<String>> {
        let at = dt_to_nanos(at)?;
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT p.phone
                     FROM phones AS p
                     JOIN calls AS c ON p.user_id = c.user_id
                     WHERE c.date_expired > ?1",
                )
                .map_err(PersistenceError::sqlite("prepare eligible phones"))?;
            let rows = stmt
                .query_map(params![at], |row| row.get::<_, String>(0))
                .map_err(PersistenceError::sqlite("query eligible phones"))?;
            let phones: BTreeSet<String> = rows
                .collect::<rusqlite::Result<_>>()
                .map_err(PersistenceError::sqlite("scan eligible phones"))?;
            Ok(phones)
        })
    }

    /// Latest expiry among the user's windows still open at `at`.
    pub fn latest_expiry(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let at = dt_to_nanos(at)?;
        let latest = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT MAX(date_expired) FROM calls WHERE user_id = ?1 AND date_expired > ?2",
                params![user_id, at],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
            .map_err(PersistenceError::sqlite("query latest expiry"))
        })?;

        Ok(latest.flatten().map(nanos_to_dt))
    }

    /// Every window the user ever opened, oldest first.
    pub fn windows_for(&self, user_id: UserId) -> Result<Vec<CallWindow>> {
        let raw = self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, date_created, date_expired
                     FROM calls WHERE user_id = ?1 ORDER BY id",
                )
                .map_err(PersistenceError::sqlite("prepare windows"))?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(PersistenceError::sqlite("query windows"))?;
            let raw: Vec<(i64, i64, i64, i64)> = rows
                .collect::<rusqlite::Result<_>>()
                .map_err(PersistenceError::sqlite("scan windows"))?;
            Ok(raw)
        })?;

        Ok(raw
            .into_iter()
            .map(|(id, user_id, created, expired)| CallWindow {
                id,
                user_id,
                created_at: nanos_to_dt(created),
                expires_at: nanos_to_dt(expired),
            })
            .collect())
    }
}
