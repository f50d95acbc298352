//! Shared SQLite handle and schema management.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{PersistenceError, Result};

const CREATE_CALLS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS calls (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        date_created INTEGER NOT NULL,
        date_expired INTEGER NOT NULL
    )";

const CREATE_PHONES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS phones (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        phone TEXT NOT NULL
    )";

/// Handle to the `calls.db` database.
///
/// Clones share one connection behind a mutex, so the registry and the
/// window store built from the same handle see each other's writes.
///
/// Every call blocks the current thread while the lock is held. Async
/// callers use the stores directly on the runtime, so statements stay
/// single-row writes or small reads.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Opens (or creates) the database file and makes sure both tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| PersistenceError::DirectoryError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenError {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        };
        db.init(false)?;
        Ok(db)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(PersistenceError::sqlite("open in-memory database"))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };
        db.init(false)?;
        Ok(db)
    }

    /// File backing this handle, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Creates the `calls` and `phones` tables.
    ///
    /// With `force`, both tables are dropped first and every registration
    /// and window is lost.
    pub fn init(&self, force: bool) -> Result<()> {
        self.with_conn(|conn| {
            if force {
                warn!("Dropping calls and phones tables");
                conn.execute_batch("DROP TABLE IF EXISTS calls; DROP TABLE IF EXISTS phones;")
                    .map_err(PersistenceError::sqlite("drop tables"))?;
            }
            conn.execute(CREATE_CALLS_TABLE, [])
                .map_err(PersistenceError::sqlite("create calls table"))?;
            conn.execute(CREATE_PHONES_TABLE, [])
                .map_err(PersistenceError::sqlite("create phones table"))?;
            Ok(())
        })?;

        if force {
            info!("Database tables recreated");
        }
        Ok(())
    }

    /// Runs `f` with exclusive access to the connection.
    pub(crate) fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        f(&conn)
    }

    /// Column names of `table`, in declaration order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT * FROM {} LIMIT 0", table))
                .map_err(PersistenceError::sqlite("describe table"))?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            Ok(columns)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .map_err(PersistenceError::sqlite("count rows"))
        })
        .unwrap()
    }

    #[test]
    fn test_schema_columns() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            db.table_columns("calls").unwrap(),
            vec!["id", "user_id", "date_created", "date_expired"]
        );
        assert_eq!(db.table_columns("phones").unwrap(), vec!["id", "user_id", "phone"]);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("calls.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_init_without_force_keeps_rows() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("INSERT INTO phones (user_id, phone) VALUES (1, '+1')", [])
                .map_err(PersistenceError::sqlite("insert"))
        })
        .unwrap();

        db.init(false).unwrap();
        assert_eq!(count(&db, "phones"), 1);
    }

    #[test]
    fn test_force_init_drops_rows() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO phones (user_id, phone) VALUES (1, '+1');
                 INSERT INTO calls (user_id, date_created, date_expired) VALUES (1, 0, 1);",
            )
            .map_err(PersistenceError::sqlite("insert"))
        })
        .unwrap();

        db.init(true).unwrap();
        assert_eq!(count(&db, "phones"), 0);
        assert_eq!(count(&db, "calls"), 0);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calls.db");

        {
            let db = Database::open(&path).unwrap();
            db.with_conn(|conn| {
                conn.execute("INSERT INTO phones (user_id, phone) VALUES (7, '+7')", [])
                    .map_err(PersistenceError::sqlite("insert"))
            })
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(count(&db, "phones"), 1);
    }
}
