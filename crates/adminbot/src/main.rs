use std::sync::Arc;

use tracing::{info, warn};

use adminbot_core::{
    config::Config,
    lifecycle::{exec_current_process, RestartMode, StopHandle, StopReason},
};

#[tokio::main]
async fn main() -> Result<(), adminbot_core::Error> {
    let cfg = Arc::new(Config::load()?);
    adminbot_core::logging::init("adminbot", cfg.debug)?;
    info!(config = ?cfg, "configuration loaded");

    let stop = StopHandle::new();
    let reason = adminbot_telegram::router::run_polling(cfg.clone(), stop)
        .await
        .map_err(|e| adminbot_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    let mode = cfg.restart_mode.effective();
    if mode != cfg.restart_mode {
        warn!("RESTART_MODE=exec is only supported on unix, exiting instead");
    }

    match (reason, mode) {
        (StopReason::Shutdown, _) => info!("shut down"),
        (StopReason::Restart, RestartMode::Exit) => {
            info!("exiting so the supervisor can start a fresh process")
        }
        (StopReason::Restart, RestartMode::Exec) => {
            info!("re-executing");
            return Err(exec_current_process());
        }
    }

    Ok(())
}
