//! Restart coordination across process lifetimes.
//!
//! `/restart` replies "Restarting...", writes the identity of that reply to the
//! restart file and only then stops the serving loop. The next process calls
//! [`RestartCoordinator::recover`] before it starts polling: if the file is
//! there, the remembered message is edited to "Restart success!" and the file
//! is removed. Confirmation is attempted at most once.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    domain::{CommandContext, MessageRef},
    errors::Error,
    lifecycle::ServingLoop,
    messaging::port::MessagingPort,
    Result,
};

pub const RESTARTING_TEXT: &str = "Restarting...";
pub const RESTART_SUCCESS_TEXT: &str = "Restart success!";

/// A confirmation message owed by the next process instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartRecord {
    #[serde(flatten)]
    pub message: MessageRef,
    pub requested_at: DateTime<Utc>,
    /// Text of the "Restarting..." message as it was sent.
    pub text: String,
}

impl RestartRecord {
    pub fn new(message: MessageRef, text: impl Into<String>) -> Self {
        Self {
            message,
            requested_at: Utc::now(),
            text: text.into(),
        }
    }
}

/// File-backed storage for the single outstanding [`RestartRecord`].
#[derive(Clone, Debug)]
pub struct RestartStore {
    path: PathBuf,
}

impl RestartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace any previous record. Returns once the data is on disk.
    pub fn save(&self, record: &RestartRecord) -> Result<()> {
        let json = serde_json::to_vec(record)?;
        let tmp = self.tmp_path();

        let write = || -> std::io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(&json)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::persistence(&self.path, e)
        })?;
        sync_parent_dir(&self.path).map_err(|e| Error::persistence(&self.path, e))
    }

    /// `Ok(None)` when no restart is pending.
    pub fn load(&self) -> Result<Option<RestartRecord>> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::persistence(&self.path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::persistence(&self.path, e))
    }

    /// Remove the record. Removing an absent record is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(&self.path, e)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "restart.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// The rename only survives a crash once the directory entry is flushed too.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// What [`RestartCoordinator::recover`] found at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// Cold start, nothing owed.
    NothingPending,
    /// The remembered message now reads "Restart success!".
    Confirmed(MessageRef),
    /// The record was valid but the edit failed; the record is gone anyway.
    EditFailed(MessageRef),
    /// The record could not be read or parsed and was discarded.
    Unreadable,
}

pub struct RestartCoordinator {
    store: RestartStore,
    messenger: Arc<dyn MessagingPort>,
    serving: Arc<dyn ServingLoop>,
}

impl RestartCoordinator {
    pub fn new(
        store: RestartStore,
        messenger: Arc<dyn MessagingPort>,
        serving: Arc<dyn ServingLoop>,
    ) -> Self {
        Self {
            store,
            messenger,
            serving,
        }
    }

    pub fn store(&self) -> &RestartStore {
        &self.store
    }

    /// Reply `prefix + "Restarting..."`, persist that reply, then stop serving.
    ///
    /// If the record cannot be written the loop keeps running and the error is
    /// returned so the caller can tell the requester. Once the loop is stopping,
    /// later requests are dropped so the first record stays the one confirmed.
    pub async fn initiate_restart(&self, ctx: &CommandContext, prefix: &str) -> Result<()> {
        if self.is_stopping() {
            info!(
                chat_id = ctx.chat_id().0,
                "restart already in progress, ignoring request"
            );
            return Ok(());
        }

        let text = format!("{prefix}{RESTARTING_TEXT}");
        let sent = self.messenger.reply_text(ctx.message, &text).await?;
        let record = RestartRecord::new(sent, text);

        if let Err(e) = self.store.save(&record) {
            error!(chat_id = sent.chat_id.0, "restart aborted: {e}");
            return Err(e);
        }

        info!(
            chat_id = sent.chat_id.0,
            message_id = sent.message_id.0,
            path = %self.store.path().display(),
            "restart record saved, stopping serving loop"
        );
        self.serving.stop();
        Ok(())
    }

    /// True once a restart record was saved and the loop was asked to stop.
    pub fn is_stopping(&self) -> bool {
        self.serving.is_stopped()
    }

    /// Confirm a pending restart, if any. Runs once per process, before polling.
    pub async fn recover(&self) -> Recovery {
        let record = match self.store.load() {
            Ok(None) => {
                debug!("no pending restart");
                return Recovery::NothingPending;
            }
            Ok(Some(r)) => r,
            Err(e) => {
                warn!("ignoring unreadable restart record: {e}");
                self.discard();
                return Recovery::Unreadable;
            }
        };

        let age = Utc::now().signed_duration_since(record.requested_at);
        let edited = self
            .messenger
            .edit_text(record.message, RESTART_SUCCESS_TEXT)
            .await;
        self.discard();

        match edited {
            Ok(()) => {
                info!(
                    chat_id = record.message.chat_id.0,
                    message_id = record.message.message_id.0,
                    downtime_secs = age.num_seconds(),
                    text = %record.text,
                    "restart confirmed"
                );
                Recovery::Confirmed(record.message)
            }
            Err(e) => {
                warn!(
                    chat_id = record.message.chat_id.0,
                    message_id = record.message.message_id.0,
                    text = %record.text,
                    "could not confirm restart: {e}"
                );
                Recovery::EditFailed(record.message)
            }
        }
    }

    fn discard(&self) {
        if let Err(e) = self.store.clear() {
            error!("failed to remove restart record: {e}");
        }
    }
}
