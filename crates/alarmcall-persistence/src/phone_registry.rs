//! Registered phone numbers, one per user.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::database::Database;
use crate::error::{PersistenceError, Result};
use crate::models::{PhoneRegistration, UserId};

/// Maps Telegram users to the phone the bot should call.
///
/// Uniqueness per user is not enforced by the table: callers check with
/// [`PhoneRegistry::lookup`] before calling [`PhoneRegistry::register`].
#[derive(Clone)]
pub struct PhoneRegistry {
    db: Database,
}

impl PhoneRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a registration row unconditionally.
    pub fn register(&self, user_id: UserId, phone: &str) -> Result<PhoneRegistration> {
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO phones (user_id, phone) VALUES (?1, ?2)",
                params![user_id, phone],
            )
            .map_err(PersistenceError::sqlite("insert phone"))?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!(user_id = %user_id, "Phone registered");
        Ok(PhoneRegistration {
            id,
            user_id,
            phone: phone.to_string(),
        })
    }

    /// Returns the user's phone, or `None` if they have not registered one.
    ///
    /// When duplicate rows exist the earliest registration wins.
    pub fn lookup(&self, user_id: UserId) -> Result<Option<String>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT phone FROM phones WHERE user_id = ?1 ORDER BY id LIMIT 1",
                params![user_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(PersistenceError::sqlite("lookup phone"))
        })
    }

    pub fn is_registered(&self, user_id: UserId) -> Result<bool> {
        Ok(self.lookup(user_id)?.is_some())
    }

    /// All registration rows for a user, oldest first.
    pub fn registrations_for(&self, user_id: UserId) -> Result<Vec<PhoneRegistration>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, user_id, phone FROM phones WHERE user_id = ?1 ORDER BY id")
                .map_err(PersistenceError::sqlite("prepare registrations"))?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(PhoneRegistration {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        phone: row.get(2)?,
                    })
                })
                .map_err(PersistenceError::sqlite("query registrations"))?;
            let registrations: Vec<PhoneRegistration> = rows
                .collect::<rusqlite::Result<_>>()
                .map_err(PersistenceError::sqlite("scan registrations"))?;
            Ok(registrations)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PhoneRegistry {
        PhoneRegistry::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_register_and_lookup() {
        let phones = registry();
        let reg = phones.register(10, "+111111111111").unwrap();

        assert_eq!(reg.user_id, 10);
        assert_eq!(phones.lookup(10).unwrap().as_deref(), Some("+111111111111"));
        assert!(phones.is_registered(10).unwrap());
    }

    #[test]
    fn test_lookup_unknown_user_is_none() {
        let phones = registry();
        assert_eq!(phones.lookup(99).unwrap(), None);
        assert!(!phones.is_registered(99).unwrap());
    }

    #[test]
    fn test_register_does_not_deduplicate() {
        let phones = registry();
        phones.register(10, "+1").unwrap();
        phones.register(10, "+2").unwrap();

        let rows = phones.registrations_for(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(phones.lookup(10).unwrap().as_deref(), Some("+1"));
    }

    #[test]
    fn test_users_are_isolated() {
        let phones = registry();
        phones.register(1, "+1").unwrap();
        phones.register(2, "+2").unwrap();

        assert_eq!(phones.lookup(1).unwrap().as_deref(), Some("+1"));
        assert_eq!(phones.lookup(2).unwrap().as_deref(), Some("+2"));
    }
}
