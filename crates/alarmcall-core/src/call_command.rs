//! Parser for the `/call N` command.
//!
//! Accepts messages like:
//! ```text
//! /call 5
//! /call5
//! /call@AlarmCallBot 12
//! ```
//!
//! Anything after the digits is ignored.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Longest window a user may open when no override is configured.
pub const DEFAULT_MAX_CALL_HOURS: u32 = 24;

/// `/call`, optional bot mention, optional whitespace, then digits.
static CALL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/call(?:@[A-Za-z0-9_]+)?\s*([0-9]+)").expect("Invalid call regex")
});

/// `/call` with an optional captured mention, then whitespace, a digit or the end.
static CALL_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/call(?:@([A-Za-z0-9_]+))?(?:\s|[0-9]|$)").expect("Invalid call prefix regex")
});

/// Reasons a `/call` message is rejected. Shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallCommandError {
    #[error("The message must match the pattern /call hours")]
    Malformed,

    #[error("Number of hours must be greater than 0")]
    NotPositive,

    #[error("Number of hours must not exceed {max}")]
    TooLarge { max: u32 },
}

/// Extract the number of hours from a `/call N` message.
///
/// Returns `N` when `1 <= N <= max_hours`.
pub fn parse_call_hours(text: &str, max_hours: u32) -> Result<u32, CallCommandError> {
    let captures = CALL_REGEX
        .captures(text)
        .ok_or(CallCommandError::Malformed)?;
    let digits = captures
        .get(1)
        .map(|m| m.as_str())
        .ok_or(CallCommandError::Malformed)?;

    // Digits only, so the sole parse failure is overflow.
    let hours = digits
        .parse::<u32>()
        .map_err(|_| CallCommandError::TooLarge { max: max_hours })?;

    if hours == 0 {
        return Err(CallCommandError::NotPositive);
    }
    if hours > max_hours {
        return Err(CallCommandError::TooLarge { max: max_hours });
    }
    Ok(hours)
}

/// Bot username a `/command@bot` message is addressed to, if any.
pub fn command_mention(text: &str) -> Option<&str> {
    let command = text.strip_prefix('/')?.split_whitespace().next()?;
    command.split_once('@').map(|(_, mention)| mention)
}

/// Whether a `/command` is for this bot: no mention, or a mention of `bot_username`.
pub fn is_addressed_to(text: &str, bot_username: Option<&str>) -> bool {
    match command_mention(text) {
        None => true,
        Some(mention) => bot_username.is_some_and(|name| name.eq_ignore_ascii_case(mention)),
    }
}

/// Whether `text` is a `/call` message for this bot, including the `/call5` form.
///
/// Longer commands like `/callme` and mentions of other bots do not match.
pub fn is_call_command(text: &str, bot_username: Option<&str>) -> bool {
    let Some(captures) = CALL_PREFIX_REGEX.captures(text) else {
        return false;
    };
    match captures.get(1) {
        None => true,
        Some(mention) => {
            bot_username.is_some_and(|name| name.eq_ignore_ascii_case(mention.as_str()))
        }
    }
}
