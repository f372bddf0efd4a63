use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
///
/// Chat id plus message id is everything the Bot API needs to edit, pin or
/// delete a message, so this is also what survives a restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// The user who sent a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub full_name: String,
}

/// Per-invocation data for a single command. Never persisted.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// The message carrying the command.
    pub message: MessageRef,
    /// The message the command replies to, if any.
    pub reply_to: Option<MessageRef>,
    pub sender: Option<Sender>,
}

impl CommandContext {
    pub fn chat_id(&self) -> ChatId {
        self.message.chat_id
    }
}
