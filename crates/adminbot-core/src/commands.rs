//! Command table and handlers.
//!
//! Handlers only talk to the ports, so the whole command surface runs against
//! fakes in tests. Every error stops at [`CommandService::handle`], where it is
//! logged and turned into a reply; nothing propagates into the polling loop.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    config::Config,
    domain::CommandContext,
    errors::Error,
    formatting::greeting_html,
    messaging::{port::MessagingPort, types::BotCommandSpec},
    restart::RestartCoordinator,
    security::is_authorized,
    update::{SourceSync, UpdateRunner},
    Result,
};

pub const PERMISSION_DENIED_TEXT: &str = "Permission denied";
pub const REPLY_REQUIRED_TEXT: &str = "Please reply to a message!";
pub const GENERIC_FAILURE_TEXT: &str = "Oops, something went wrong! Please check the logs.";
pub const RESTART_ABORTED_TEXT: &str =
    "Restart aborted: could not save restart state. Please check logs.";
pub const COMMANDS_UPDATED_TEXT: &str = "Bot commands updated.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    SetCommands,
    Update,
    Restart,
    Pin,
    Unpin,
}

const COMMAND_TABLE: &[(&str, Command)] = &[
    ("start", Command::Start),
    ("ping", Command::Start),
    ("help", Command::Help),
    ("set_commands", Command::SetCommands),
    ("update", Command::Update),
    ("restart", Command::Restart),
    ("pin", Command::Pin),
    ("unpin", Command::Unpin),
];

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| *c)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::SetCommands => "set_commands",
            Command::Update => "update",
            Command::Restart => "restart",
            Command::Pin => "pin",
            Command::Unpin => "unpin",
        }
    }

    pub fn requires_admin(self) -> bool {
        matches!(
            self,
            Command::SetCommands | Command::Update | Command::Restart
        )
    }
}

/// Menu registered by `/set_commands`.
pub fn command_menu() -> Vec<BotCommandSpec> {
    vec![
        BotCommandSpec::new("help", "Show help"),
        BotCommandSpec::new("pin", "Reply to a message to pin it"),
        BotCommandSpec::new("unpin", "Reply to a message to unpin it"),
    ]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    /// `bot` in `/cmd@bot`.
    pub mention: Option<String>,
    pub args: String,
}

impl ParsedCommand {
    pub fn command(&self) -> Option<Command> {
        Command::from_name(&self.name)
    }

    /// Commands without a mention are addressed to every bot in the chat.
    pub fn is_addressed_to(&self, bot_username: &str) -> bool {
        self.mention
            .as_deref()
            .map_or(true, |m| m.eq_ignore_ascii_case(bot_username))
    }
}

/// Split `/cmd@botname arg1 ...`. `None` for text that is not a command.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim().to_string();

    let (name, mention) = match first.split_once('@') {
        Some((n, m)) => (n, Some(m.to_string())),
        None => (first, None),
    };
    if name.is_empty() {
        return None;
    }

    Some(ParsedCommand {
        name: name.to_lowercase(),
        mention,
        args,
    })
}

/// User-facing text for an error caught at the handler boundary.
pub fn failure_notice(err: &Error) -> &'static str {
    match err {
        Error::Unauthorized(_) => PERMISSION_DENIED_TEXT,
        Error::Persistence { .. } => RESTART_ABORTED_TEXT,
        _ => GENERIC_FAILURE_TEXT,
    }
}

pub struct CommandService {
    cfg: Arc<Config>,
    messenger: Arc<dyn MessagingPort>,
    restart: Arc<RestartCoordinator>,
    update: UpdateRunner,
}

impl CommandService {
    pub fn new(
        cfg: Arc<Config>,
        messenger: Arc<dyn MessagingPort>,
        restart: Arc<RestartCoordinator>,
        sync: Arc<dyn SourceSync>,
    ) -> Self {
        let update = UpdateRunner::new(sync, messenger.clone(), restart.clone());
        Self {
            cfg,
            messenger,
            restart,
            update,
        }
    }

    pub async fn handle(&self, cmd: Command, ctx: &CommandContext) {
        let chat_id = ctx.chat_id().0;
        info!(chat_id, command = cmd.name(), "command received");

        if self.restart.is_stopping() {
            info!(chat_id, command = cmd.name(), "restart in progress, dropping command");
            return;
        }

        let Err(err) = self.dispatch(cmd, ctx).await else {
            return;
        };
        match &err {
            Error::Unauthorized(_) => info!(chat_id, command = cmd.name(), "{err}"),
            _ => error!(chat_id, command = cmd.name(), "command failed: {err}"),
        }
        if let Err(e) = self
            .messenger
            .reply_text(ctx.message, failure_notice(&err))
            .await
        {
            warn!(chat_id, "could not report failure: {e}");
        }
    }

    async fn dispatch(&self, cmd: Command, ctx: &CommandContext) -> Result<()> {
        if cmd.requires_admin() {
            self.require_admin(ctx)?;
        }

        match cmd {
            Command::Start => self.start(ctx).await,
            Command::Help => self.help(ctx).await,
            Command::SetCommands => self.set_commands(ctx).await,
            Command::Update => self.update.run(ctx).await,
            Command::Restart => self.restart.initiate_restart(ctx, "").await,
            Command::Pin => self.toggle_pin(ctx, true).await,
            Command::Unpin => self.toggle_pin(ctx, false).await,
        }
    }

    fn require_admin(&self, ctx: &CommandContext) -> Result<()> {
        if is_authorized(ctx.chat_id(), &self.cfg.admin_chats) {
            Ok(())
        } else {
            Err(Error::Unauthorized(ctx.chat_id().0))
        }
    }

    async fn start(&self, ctx: &CommandContext) -> Result<()> {
        let html = greeting_html(ctx.sender.as_ref());
        self.messenger.reply_html(ctx.message, &html).await?;
        Ok(())
    }

    async fn help(&self, ctx: &CommandContext) -> Result<()> {
        self.messenger
            .reply_html(ctx.message, &self.cfg.help_text)
            .await?;
        Ok(())
    }

    async fn set_commands(&self, ctx: &CommandContext) -> Result<()> {
        self.messenger.set_my_commands(&command_menu()).await?;
        self.messenger
            .reply_text(ctx.message, COMMANDS_UPDATED_TEXT)
            .await?;
        Ok(())
    }

    // A failed toggle goes to the boundary (generic notice) and the command
    // message is left in place.
    async fn toggle_pin(&self, ctx: &CommandContext, pin: bool) -> Result<()> {
        let Some(target) = ctx.reply_to else {
            self.messenger
                .reply_text(ctx.message, REPLY_REQUIRED_TEXT)
                .await?;
            return Ok(());
        };

        if pin {
            self.messenger.pin_message(target, true).await?;
        } else {
            self.messenger.unpin_message(target).await?;
        }

        if let Err(e) = self.messenger.delete_message(ctx.message).await {
            warn!(chat_id = ctx.chat_id().0, "could not delete command message: {e}");
        }
        Ok(())
    }
}
