//! Command handlers for the Telegram bot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};

use crate::error::TelegramError;
use crate::state::{BotState, CallOutcome, ContactOutcome, NumberOutcome};

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get help")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Set the call for N hours: /call N")]
    Call(String),

    #[command(description = "Save your phone number")]
    Number,

    #[command(description = "Show your phone number and call window")]
    Status,
}

const GENERIC_FAILURE: &str = "Something went wrong, please try again later.";

/// Expiry times are shown in UTC.
fn format_expiry(at: DateTime<Utc>) -> String {
    format!("{} UTC", at.format("%m/%d/%Y, %H:%M"))
}

fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|u| u.id.0 as i64)
}

/// Reply with a hint and return false unless the message is in a private chat.
async fn ensure_private_chat(bot: &Bot, msg: &Message) -> ResponseResult<bool> {
    if msg.chat.is_private() {
        return Ok(true);
    }
    debug!(chat_id = %msg.chat.id, "Command sent in a public chat");
    bot.send_message(
        msg.chat.id,
        "To add a phone number write the command /number in a private message to the bot",
    )
    .await?;
    Ok(false)
}

async fn reply_failure(bot: &Bot, msg: &Message, e: TelegramError) -> ResponseResult<()> {
    error!(chat_id = %msg.chat.id, error = %e, "Request failed");
    bot.send_message(msg.chat.id, GENERIC_FAILURE).await?;
    Ok(())
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message) -> ResponseResult<()> {
    if !ensure_private_chat(&bot, &msg).await? {
        return Ok(());
    }
    info!(chat_id = %msg.chat.id, user = ?sender_id(&msg), "Start message");

    bot.send_message(
        msg.chat.id,
        "To set the call for N hours when an urgent alert appears use <b>/call N</b> command.\n\n\
        Save your phone number first with <b>/number</b>.",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Handle /call N: open a call window for the sender.
pub async fn handle_call(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !ensure_private_chat(&bot, &msg).await? {
        return Ok(());
    }
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let text = msg.text().unwrap_or_default();
    info!(user_id = %user_id, "Call message");

    match state.open_call_window(user_id, text, Utc::now()) {
        Ok(CallOutcome::NoPhone) => {
            bot.send_message(
                msg.chat.id,
                "There is no information which phone to set call for. \
                Send your phone number with the command <b>/number</b> in bot private messages",
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        Ok(CallOutcome::Invalid(e)) => {
            bot.send_message(msg.chat.id, format!("Error in command: {}", e))
                .await?;
        }
        Ok(CallOutcome::Opened(window)) => {
            bot.send_message(
                msg.chat.id,
                format!("The call is set until {}", format_expiry(window.expires_at)),
            )
            .await?;
        }
        Err(e) => reply_failure(&bot, &msg, e).await?,
    }
    Ok(())
}

/// Handle /number: ask for the sender's contact unless a phone is saved.
pub async fn handle_number(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !ensure_private_chat(&bot, &msg).await? {
        return Ok(());
    }
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.number_request(user_id) {
        Ok(NumberOutcome::AlreadySaved) => {
            bot.send_message(msg.chat.id, "Your phone number is already saved in the database")
                .await?;
        }
        Ok(NumberOutcome::RequestContact) => {
            info!(user_id = %user_id, "Requesting number");
            let keyboard = KeyboardMarkup::new(vec![vec![
                KeyboardButton::new("Send phone number").request(ButtonRequest::Contact),
            ]])
            .resize_keyboard();
            bot.send_message(msg.chat.id, "Send your phone number by clicking the button")
                .reply_markup(keyboard)
                .await?;
        }
        Err(e) => reply_failure(&bot, &msg, e).await?,
    }
    Ok(())
}

/// Handle /status: show the saved phone and the latest open window.
pub async fn handle_status(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !ensure_private_chat(&bot, &msg).await? {
        return Ok(());
    }
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    let status = match state.user_status(user_id, Utc::now()) {
        Ok(status) => status,
        Err(e) => return reply_failure(&bot, &msg, e).await,
    };

    let phone_line = match status.phone {
        Some(phone) => format!("Phone: {}", phone),
        None => "Phone: not saved, use /number".to_string(),
    };
    let window_line = match status.active_until {
        Some(at) => format!("Calls enabled until {}", format_expiry(at)),
        None => "No active call window, use /call N".to_string(),
    };

    bot.send_message(msg.chat.id, format!("{}\n{}", phone_line, window_line))
        .await?;
    Ok(())
}

/// Handle a shared contact card.
pub async fn handle_contact(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let (Some(user_id), Some(contact)) = (sender_id(&msg), msg.contact()) else {
        return Ok(());
    };
    info!(user_id = %user_id, "Message with contact");

    let owner = contact.user_id.map(|id| id.0 as i64);
    match state.save_contact(user_id, owner, &contact.phone_number) {
        Ok(ContactOutcome::Saved) => {
            bot.send_message(msg.chat.id, "Phone number successfully added!")
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        Ok(ContactOutcome::AlreadySaved) => {
            bot.send_message(msg.chat.id, "Your phone number is already saved in the database")
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        Ok(ContactOutcome::NotOwnContact) => {
            bot.send_message(msg.chat.id, "Please share your own phone number")
                .await?;
        }
        Err(e) => reply_failure(&bot, &msg, e).await?,
    }
    Ok(())
}

/// Handle a post in a channel the bot is a member of.
pub async fn handle_channel_post(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if msg.text().is_none() {
        return Ok(());
    }

    match state.trigger().on_channel_post(msg.chat.id.0, Utc::now()).await {
        Ok(report) if report.dispatched => {
            info!(
                channel_id = %msg.chat.id,
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "Alert handled"
            );
        }
        Ok(_) => {}
        Err(e) => {
            error!(channel_id = %msg.chat.id, error = %e, "Failed to look up phones to call");
        }
    }
    Ok(())
}

/// Dispatch commands to appropriate handlers.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Call(_) => handle_call(bot, msg, state).await,
        Command::Number => handle_number(bot, msg, state).await,
        Command::Status => handle_status(bot, msg, state).await,
    }
}
