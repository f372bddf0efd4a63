//! `/update`: pull the latest sources, then restart.

use std::{path::PathBuf, process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::{
    domain::CommandContext, errors::Error, messaging::port::MessagingPort,
    restart::RestartCoordinator, Result,
};

pub const UPDATE_SUCCESS_PREFIX: &str = "Update success! ";
pub const UPDATE_FAILED_TEXT: &str = "Update failed! Please check logs.";

/// Captured output of a successful sync.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The external source-sync operation (`git pull` by default).
///
/// Implementations return [`Error::ExternalOperation`] for a non-zero exit,
/// carrying whatever the process wrote to stderr.
#[async_trait]
pub trait SourceSync: Send + Sync {
    async fn sync(&self) -> Result<SyncOutput>;
}

/// Runs a fixed command line, non-interactively, with captured output.
#[derive(Clone, Debug)]
pub struct CommandSync {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandSync {
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Config("UPDATE_COMMAND must not be empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: None,
            timeout: None,
        })
    }

    pub fn current_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl SourceSync for CommandSync {
    async fn sync(&self) -> Result<SyncOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let run = cmd.output();
        let output = match self.timeout {
            Some(t) => tokio::time::timeout(t, run).await.map_err(|_| {
                Error::ExternalOperation(format!(
                    "`{}` timed out after {}s",
                    self.command_line(),
                    t.as_secs_f32()
                ))
            })?,
            None => run.await,
        }
        .map_err(|e| {
            Error::ExternalOperation(format!("failed to run `{}`: {e}", self.command_line()))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            return Err(Error::ExternalOperation(format!(
                "`{}` exited with {}: {stderr}",
                self.command_line(),
                output.status
            )));
        }

        Ok(SyncOutput { stdout, stderr })
    }
}

pub struct UpdateRunner {
    sync: Arc<dyn SourceSync>,
    messenger: Arc<dyn MessagingPort>,
    restart: Arc<RestartCoordinator>,
}

impl UpdateRunner {
    pub fn new(
        sync: Arc<dyn SourceSync>,
        messenger: Arc<dyn MessagingPort>,
        restart: Arc<RestartCoordinator>,
    ) -> Self {
        Self {
            sync,
            messenger,
            restart,
        }
    }

    /// Sync once. Restart on success, report and keep serving on failure.
    pub async fn run(&self, ctx: &CommandContext) -> Result<()> {
        match self.sync.sync().await {
            Ok(out) => {
                debug!(stdout = %out.stdout, stderr = %out.stderr, "sync output");
                info!(chat_id = ctx.chat_id().0, "update succeeded, restarting");
                self.restart
                    .initiate_restart(ctx, UPDATE_SUCCESS_PREFIX)
                    .await
            }
            Err(e) => {
                error!(chat_id = ctx.chat_id().0, "update failed: {e}");
                self.messenger
                    .reply_text(ctx.message, UPDATE_FAILED_TEXT)
                    .await?;
                Ok(())
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSync {
        CommandSync::new(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    #[test]
    fn rejects_empty_command() {
        assert!(matches!(CommandSync::new(&[]), Err(Error::Config(_))));
    }

    #[test]
    fn command_line_joins_argv() {
        let c = CommandSync::new(&["git".to_string(), "pull".to_string()]).unwrap();
        assert_eq!(c.command_line(), "git pull");
    }

    #[tokio::test]
    async fn captures_output_on_success() {
        let out = sh("echo pulled; echo note >&2").sync().await.unwrap();
        assert_eq!(out.stdout, "pulled");
        assert_eq!(out.stderr, "note");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let err = sh("echo 'not a git repository' >&2; exit 1")
            .sync()
            .await
            .unwrap_err();
        match err {
            Error::ExternalOperation(msg) => assert!(msg.contains("not a git repository")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn stdin_is_closed() {
        // `read` fails immediately on EOF instead of waiting for input.
        let err = sh("read line").sync().await.unwrap_err();
        assert!(matches!(err, Error::ExternalOperation(_)));
    }

    #[tokio::test]
    async fn times_out() {
        let err = sh("sleep 5")
            .timeout(Some(Duration::from_millis(100)))
            .sync()
            .await
            .unwrap_err();
        match err {
            Error::ExternalOperation(msg) => assert!(msg.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn runs_in_configured_dir() {
        let out = sh("pwd")
            .current_dir(Some(PathBuf::from("/")))
            .sync()
            .await
            .unwrap();
        assert_eq!(out.stdout, "/");
    }

    #[tokio::test]
    async fn missing_program_is_an_external_error() {
        let c = CommandSync::new(&["/nonexistent/adminbot-sync".to_string()]).unwrap();
        assert!(matches!(
            c.sync().await.unwrap_err(),
            Error::ExternalOperation(_)
        ));
    }
}
