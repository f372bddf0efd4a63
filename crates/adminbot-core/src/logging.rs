use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// Default: info for our crates (debug when `debug` is set), warn for the HTTP
/// stack underneath teloxide. Can be overridden with `RUST_LOG`.
pub fn init(service_name: &str, debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name, level)));

    fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install logger: {e}")))?;

    Ok(())
}

fn default_directives(service_name: &str, level: &str) -> String {
    format!(
        "{level},{service_name}={level},adminbot_core={level},adminbot_telegram={level},hyper=warn,reqwest=warn"
    )
}
