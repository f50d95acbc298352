//! Main Telegram bot implementation.

use std::sync::Arc;

use alarmcall_core::{is_addressed_to, is_call_command, Settings};
use alarmcall_persistence::{CallWindowStore, Database};
use alarmcall_zvonok::{RetryPolicy, ZvonokClient, ZvonokConfig};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::error::{Result, TelegramError};
use crate::handlers::{
    handle_call, handle_channel_post, handle_command, handle_contact, Command,
};
use crate::state::BotState;
use crate::trigger::CallTrigger;

/// Environment variable holding the bot token.
pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Build the Zvonok client settings from the bot settings.
pub fn zvonok_config(settings: &Settings) -> ZvonokConfig {
    ZvonokConfig::new(
        settings.zvonok_api_token.clone(),
        settings.zvonok_campaign_id.clone(),
        settings.zvonok_api_uri.clone(),
    )
    .with_retry(RetryPolicy {
        max_attempts: settings.zvonok_max_attempts,
        ..RetryPolicy::default()
    })
}

/// Wire the stores, the call client and the trigger into bot state.
///
/// Fails when the Zvonok token is missing.
pub fn build_state(settings: &Settings, db: Database) -> Result<Arc<BotState>> {
    let client = ZvonokClient::new(zvonok_config(settings))?;
    let trigger = CallTrigger::new(
        CallWindowStore::new(db.clone()),
        Arc::new(client),
        settings.alert_channels.clone(),
    );
    Ok(Arc::new(BotState::new(db, trigger, settings.max_call_hours)))
}

/// The Alarm Call Telegram bot.
pub struct AlarmCallBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
}

impl AlarmCallBot {
    /// Create a new bot.
    ///
    /// Requires `TELEGRAM_BOT_TOKEN` and `ZVONOK_API_TOKEN` to be set.
    pub fn new(settings: &Settings, db: Database) -> Result<Self> {
        let token = std::env::var(TELEGRAM_BOT_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(TelegramError::NoToken)?;

        Ok(Self::with_state(Bot::new(token), build_state(settings, db)?))
    }

    /// Create a bot with custom state.
    pub fn with_state(bot: Bot, state: Arc<BotState>) -> Self {
        Self { bot, state }
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in polling mode. Runs until Ctrl+C.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "Failed to register command list");
        }

        let state_for_posts = Arc::clone(&self.state);
        let state_for_commands = Arc::clone(&self.state);
        let state_for_contacts = Arc::clone(&self.state);
        let state_for_calls = Arc::clone(&self.state);

        let handler = dptree::entry()
            .branch(
                Update::filter_channel_post().endpoint(move |msg: Message| {
                    let state = Arc::clone(&state_for_posts);
                    async move { handle_channel_post(msg, state).await }
                }),
            )
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.contact().is_some())
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_contacts);
                        async move { handle_contact(bot, msg, state).await }
                    }),
            )
            .branch(
                // "/call5" has no space, so the command parser misses it.
                Update::filter_message()
                    .filter(|msg: Message, me: Me| {
                        msg.text()
                            .is_some_and(|t| is_call_command(t, me.user.username.as_deref()))
                    })
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_calls);
                        async move { handle_call(bot, msg, state).await }
                    }),
            )
            .branch(
                // Commands for other bots in a group are left alone.
                Update::filter_message()
                    .filter(|msg: Message, me: Me| {
                        msg.text().is_some_and(|t| {
                            t.starts_with('/') && is_addressed_to(t, me.user.username.as_deref())
                        })
                    })
                    .endpoint(|bot: Bot, msg: Message| async move {
                        if let Some(text) = msg.text() {
                            info!(cmd = %text, "Unrecognized command");
                            bot.send_message(
                                msg.chat.id,
                                format!(
                                    "Unknown command: {}\n\nUse /help to see available commands.",
                                    text.split_whitespace().next().unwrap_or(text)
                                ),
                            )
                            .await?;
                        }
                        Ok(())
                    }),
            );

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.id);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
