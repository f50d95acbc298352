//! Persistence layer for Alarm Call.
//!
//! Two tables in one SQLite file: `phones` maps a Telegram user to the
//! phone they registered, and `calls` is an append-only log of call
//! windows. A phone is eligible for a call while its owner holds a window
//! that has not expired yet.
//!
//! # Example
//!
//! ```no_run
//! use alarmcall_persistence::{CallWindowStore, Database, PhoneRegistry};
//! use chrono::Utc;
//!
//! let db = Database::open("/home/user/.alarm-call/db/calls.db").unwrap();
//! let phones = PhoneRegistry::new(db.clone());
//! let windows = CallWindowStore::new(db);
//!
//! if phones.lookup(42).unwrap().is_none() {
//!     phones.register(42, "+15550001111").unwrap();
//! }
//! windows.open_for_hours(42, Utc::now(), 2).unwrap();
//!
//! let eligible = windows.phones_eligible_at(Utc::now()).unwrap();
//! ```

pub mod database;
pub mod error;
pub mod models;
pub mod phone_registry;
pub mod window_store;

pub use database::Database;
pub use error::{PersistenceError, Result};
pub use models::{CallWindow, PhoneRegistration, UserId};
pub use phone_registry::PhoneRegistry;
pub use window_store::CallWindowStore;
