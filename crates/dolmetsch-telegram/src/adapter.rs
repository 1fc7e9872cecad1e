//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` and drives the long-polling dispatcher until the
//! process exits. No public URL required.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{info, warn};

use dolmetsch_agent::pipeline::{Dispatcher, COMMANDS};

use crate::error::TelegramError;
use crate::handler::handle_message;

pub struct TelegramAdapter {
    bot: Bot,
    dispatcher: Arc<Dispatcher>,
}

impl TelegramAdapter {
    pub fn new(bot_token: &str, dispatcher: Arc<Dispatcher>) -> Result<Self, TelegramError> {
        let token = bot_token.trim();
        if token.is_empty() {
            return Err(TelegramError::NoToken);
        }
        Ok(Self {
            bot: Bot::new(token),
            dispatcher,
        })
    }

    /// Register the command menu, then poll until the process is stopped.
    pub async fn run(self) {
        match register_commands(&self.bot).await {
            Ok(()) => info!(count = COMMANDS.len(), "Telegram: command menu registered"),
            Err(e) => warn!(error = %e, "Telegram: failed to register command menu"),
        }

        info!("Telegram: starting long-polling dispatcher");

        let handler = Update::filter_message().endpoint(handle_message);

        teloxide::dispatching::Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.dispatcher])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram: dispatcher stopped");
    }
}

async fn register_commands(bot: &Bot) -> Result<(), TelegramError> {
    let commands = COMMANDS
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description));
    bot.set_my_commands(commands).await?;
    Ok(())
}
