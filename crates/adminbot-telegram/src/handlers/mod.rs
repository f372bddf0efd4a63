//! Telegram update handlers.
//!
//! The adapter only turns a Telegram message into a [`CommandContext`] and
//! hands it to the core `CommandService`; authorization and replies happen there.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use adminbot_core::{
    commands::parse_command,
    domain::{ChatId, CommandContext, MessageId, MessageRef, Sender, UserId},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(parsed) = parse_command(text) else {
        return Ok(());
    };
    if !parsed.is_addressed_to(&state.bot_username) {
        return Ok(());
    }
    let Some(cmd) = parsed.command() else {
        debug!(chat_id = msg.chat.id.0, name = %parsed.name, "ignoring unknown command");
        return Ok(());
    };

    let ctx = command_context(&msg);
    let _guard = state.serial.lock().await;
    state.commands.handle(cmd, &ctx).await;
    Ok(())
}

fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    }
}

fn command_context(msg: &Message) -> CommandContext {
    CommandContext {
        message: message_ref(msg),
        reply_to: msg.reply_to_message().map(message_ref),
        sender: msg.from().map(|u| Sender {
            id: UserId(u.id.0 as i64),
            full_name: u.full_name(),
        }),
    }
}
