//! Shared state for the Telegram bot.
//!
//! Holds the stores and the trigger, and implements the decisions behind
//! each command so handlers only deal with Telegram I/O.

use alarmcall_core::{parse_call_hours, CallCommandError};
use alarmcall_persistence::{CallWindow, CallWindowStore, Database, PhoneRegistry, UserId};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::Result;
use crate::trigger::CallTrigger;

/// Result of a `/call N` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// User has no phone to call.
    NoPhone,
    /// Command text rejected.
    Invalid(CallCommandError),
    Opened(CallWindow),
}

/// Result of a `/number` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberOutcome {
    AlreadySaved,
    /// Ask the user to share their contact.
    RequestContact,
}

/// Result of a shared contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactOutcome {
    Saved,
    AlreadySaved,
    /// Contact belongs to somebody else.
    NotOwnContact,
}

/// What `/status` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatus {
    pub phone: Option<String>,
    pub active_until: Option<DateTime<Utc>>,
}

/// Shared state for the bot, accessible across all handlers.
pub struct BotState {
    phones: PhoneRegistry,
    windows: CallWindowStore,
    trigger: CallTrigger,
    max_call_hours: u32,
}

impl BotState {
    pub fn new(db: Database, trigger: CallTrigger, max_call_hours: u32) -> Self {
        Self {
            phones: PhoneRegistry::new(db.clone()),
            windows: CallWindowStore::new(db),
            trigger,
            max_call_hours,
        }
    }

    pub fn trigger(&self) -> &CallTrigger {
        &self.trigger
    }

    pub fn max_call_hours(&self) -> u32 {
        self.max_call_hours
    }

    /// Open a call window from a `/call N` message.
    pub fn open_call_window(
        &self,
        user_id: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<CallOutcome> {
        if self.phones.lookup(user_id)?.is_none() {
            info!(user_id = %user_id, "No number saved for user");
            return Ok(CallOutcome::NoPhone);
        }

        let hours = match parse_call_hours(text, self.max_call_hours) {
            Ok(hours) => hours,
            Err(e) => {
                info!(user_id = %user_id, text = %text, error = %e, "Can't parse hours from message");
                return Ok(CallOutcome::Invalid(e));
            }
        };

        let window = self.windows.open_for_hours(user_id, now, hours)?;
        info!(
            user_id = %user_id,
            hours,
            expires_at = %window.expires_at,
            "Call window opened"
        );
        Ok(CallOutcome::Opened(window))
    }

    pub fn number_request(&self, user_id: UserId) -> Result<NumberOutcome> {
        if self.phones.is_registered(user_id)? {
            info!(user_id = %user_id, "Number already saved");
            Ok(NumberOutcome::AlreadySaved)
        } else {
            Ok(NumberOutcome::RequestContact)
        }
    }

    /// Register a phone from a shared contact.
    ///
    /// `contact_owner` is the Telegram user the contact card belongs to, when
    /// Telegram reports one.
    pub fn save_contact(
        &self,
        user_id: UserId,
        contact_owner: Option<UserId>,
        phone: &str,
    ) -> Result<ContactOutcome> {
        if contact_owner.is_some_and(|owner| owner != user_id) {
            info!(user_id = %user_id, "Rejected contact of another user");
            return Ok(ContactOutcome::NotOwnContact);
        }
        if self.phones.is_registered(user_id)? {
            return Ok(ContactOutcome::AlreadySaved);
        }

        self.phones.register(user_id, phone)?;
        info!(user_id = %user_id, "Phone number added");
        Ok(ContactOutcome::Saved)
    }

    pub fn user_status(&self, user_id: UserId, now: DateTime<Utc>) -> Result<UserStatus> {
        Ok(UserStatus {
            phone: self.phones.lookup(user_id)?,
            active_until: self.windows.latest_expiry(user_id, now)?,
        })
    }
}
