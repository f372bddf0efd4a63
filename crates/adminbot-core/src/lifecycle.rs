//! Serving-loop lifecycle.
//!
//! The restart coordinator never touches the polling loop directly. It holds a
//! [`ServingLoop`] and asks it to stop; the adapter that owns the real loop
//! watches a [`StopHandle`] and shuts the dispatcher down when it fires.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{errors::Error, Result};

/// Capability to stop the running serving loop.
pub trait ServingLoop: Send + Sync {
    /// Ask the loop to stop accepting work. Must not block.
    fn stop(&self);

    /// True once [`ServingLoop::stop`] was called. Work still queued when this
    /// turns true is dropped.
    fn is_stopped(&self) -> bool;
}

/// Why the serving loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A restart was requested and its record has been persisted.
    Restart,
    /// Ctrl-C or the transport gave up.
    Shutdown,
}

/// Cloneable stop signal shared between the coordinator and the polling loop.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Resolves once [`ServingLoop::stop`] has been called on any clone.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Reason to report after the loop returned.
    pub fn reason(&self) -> StopReason {
        if self.is_stopped() {
            StopReason::Restart
        } else {
            StopReason::Shutdown
        }
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServingLoop for StopHandle {
    fn stop(&self) {
        self.tx.send_replace(true);
    }

    fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// How the process comes back after a restart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartMode {
    /// Exit and let the supervisor (systemd, docker, a shell loop) start us again.
    #[default]
    Exit,
    /// Replace the process image with a fresh copy of the current executable.
    Exec,
}

impl RestartMode {
    /// The mode actually used on this platform. `Exec` needs unix and
    /// degrades to `Exit` elsewhere.
    pub fn effective(self) -> Self {
        match self {
            Self::Exec if !cfg!(unix) => Self::Exit,
            mode => mode,
        }
    }
}

impl std::str::FromStr for RestartMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "exit" => Ok(Self::Exit),
            "exec" => Ok(Self::Exec),
            other => Err(Error::Config(format!(
                "RESTART_MODE must be `exit` or `exec`, got `{other}`"
            ))),
        }
    }
}

/// Re-execute the current binary with the same arguments.
///
/// Only returns on failure.
#[cfg(unix)]
pub fn exec_current_process() -> Error {
    use std::os::unix::process::CommandExt;

    let exe = match std::env::current_exe() {
        Ok(p) => p,
        Err(e) => return Error::Io(e),
    };
    let err = std::process::Command::new(exe)
        .args(std::env::args_os().skip(1))
        .exec();
    Error::Io(err)
}

#[cfg(not(unix))]
pub fn exec_current_process() -> Error {
    Error::Config("RESTART_MODE=exec is only supported on unix".to_string())
}
