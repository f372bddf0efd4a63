use async_trait::async_trait;

use crate::{
    domain::MessageRef,
    messaging::types::BotCommandSpec,
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation; handlers and the restart coordinator
/// talk to this trait so they can run against a fake in tests.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Plain-text reply to `to`, in the same chat.
    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef>;
    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef>;

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn pin_message(&self, msg: MessageRef, silent: bool) -> Result<()>;
    async fn unpin_message(&self, msg: MessageRef) -> Result<()>;

    async fn set_my_commands(&self, commands: &[BotCommandSpec]) -> Result<()>;
}
