//! Message handler registered in the teloxide dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::debug;

use dolmetsch_agent::pipeline::{Dispatcher, Inbound};
use dolmetsch_core::ConversationId;

use crate::send::TelegramTransport;
use crate::typing::TypingIndicator;

/// Runs for every incoming `Message`.
///
/// Messages from bots and messages without text are ignored. The chat id is
/// the conversation id. teloxide delivers the updates of one chat in order,
/// so the turn is awaited here rather than spawned.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<Dispatcher>,
) -> ResponseResult<()> {
    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let conversation = ConversationId::from(msg.chat.id.0);
    let inbound = Inbound::parse(text);
    debug!(conversation = %conversation, chars = text.chars().count(), "telegram message");

    // Held until the reply is out; dropping it stops the indicator.
    let _typing = inbound
        .calls_backend()
        .then(|| TypingIndicator::start(bot.clone(), msg.chat.id));

    let transport = TelegramTransport::new(bot);
    dispatcher.handle(&conversation, &inbound, &transport).await;
    Ok(())
}
