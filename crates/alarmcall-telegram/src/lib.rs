//! Telegram bot that places voice calls when an alert is posted.
//!
//! Users register a phone once and open time-limited call windows. When a
//! new post appears in one of the alert channels, every user with an open
//! window gets a call through the Zvonok API.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `ZVONOK_API_TOKEN`: Zvonok public API key
//!
//! See [`alarmcall_core::config`] for the optional ones.
//!
//! # Commands
//!
//! - `/start` - How to use the bot
//! - `/help` - Show available commands
//! - `/number` - Share your phone number
//! - `/call N` - Accept calls for the next N hours
//! - `/status` - Show your phone and call window

pub mod bot;
pub mod error;
pub mod handlers;
pub mod state;
pub mod trigger;

pub use bot::{build_state, zvonok_config, AlarmCallBot};
pub use error::{Result, TelegramError};
pub use state::{BotState, CallOutcome, ContactOutcome, NumberOutcome, UserStatus};
pub use trigger::{CallDispatcher, CallTrigger, TriggerReport};
