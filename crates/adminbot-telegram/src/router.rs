use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use adminbot_core::{
    commands::CommandService,
    config::Config,
    lifecycle::{StopHandle, StopReason},
    messaging::port::MessagingPort,
    restart::{Recovery, RestartCoordinator, RestartStore},
    update::CommandSync,
};

use crate::handlers;
use crate::TelegramMessenger;

pub struct AppState {
    pub commands: Arc<CommandService>,
    /// Without the leading `@`; empty when `getMe` failed.
    pub bot_username: String,
    /// Held for the whole of a command so handlers never overlap.
    pub serial: Mutex<()>,
}

/// Confirm any pending restart, then long-poll until stopped.
///
/// The loop ends either because `stop` fired (a restart was persisted) or
/// because of Ctrl-C; the returned reason tells the caller which.
pub async fn run_polling(cfg: Arc<Config>, stop: StopHandle) -> anyhow::Result<StopReason> {
    let bot = Bot::new(cfg.bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!("adminbot started: @{}", me.username());
            me.username().to_string()
        }
        Err(e) => {
            warn!("getMe failed, commands addressed with @mention will be ignored: {e}");
            String::new()
        }
    };
    info!(
        admins = cfg.admin_chats.len(),
        restart_file = %cfg.restart_file.display(),
        "serving"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let restart = Arc::new(RestartCoordinator::new(
        RestartStore::new(&cfg.restart_file),
        messenger.clone(),
        Arc::new(stop.clone()),
    ));

    // Must finish before the dispatcher takes any update.
    match restart.recover().await {
        Recovery::NothingPending => {}
        outcome => info!(?outcome, "previous restart handled"),
    }

    let sync = CommandSync::new(&cfg.update_command)?
        .current_dir(cfg.update_workdir.clone())
        .timeout(cfg.update_timeout);
    let commands = Arc::new(CommandService::new(
        cfg.clone(),
        messenger,
        restart,
        Arc::new(sync),
    ));

    let state = Arc::new(AppState {
        commands,
        bot_username,
        serial: Mutex::new(()),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    // The polling stream confirms the last processed update on shutdown, so
    // the `/restart` that stopped us is not delivered again to the next process.
    let token = dispatcher.shutdown_token();
    let watcher = stop.clone();
    tokio::spawn(async move {
        watcher.stopped().await;
        // Shutdown is initiated by the call; the returned future only waits for it.
        match token.shutdown() {
            Ok(_) => debug!("dispatcher shutting down"),
            Err(_) => debug!("dispatcher already idle"),
        }
    });

    dispatcher.dispatch().await;

    let reason = stop.reason();
    info!(?reason, "serving loop stopped");
    Ok(reason)
}
