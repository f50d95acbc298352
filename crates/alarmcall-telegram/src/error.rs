//! Error types for the Telegram bot.

use alarmcall_core::ConfigError;
use alarmcall_persistence::PersistenceError;
use alarmcall_zvonok::ZvonokError;
use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Settings could not be read.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Call client could not be built.
    #[error("Zvonok error: {0}")]
    Zvonok(#[from] ZvonokError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
