use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, lifecycle::RestartMode, security::AdminAllowList, Result};

pub const DEFAULT_HELP_TEXT: &str = "/help Show this help\n\
/pin Reply to a message to pin it\n\
/unpin Reply to a message to unpin it\n";

/// Typed configuration, loaded once at startup and immutable afterwards.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_chats: AdminAllowList,
    pub help_text: String,
    pub debug: bool,

    // Restart
    pub restart_file: PathBuf,
    pub restart_mode: RestartMode,

    // Update
    pub update_command: Vec<String>,
    pub update_workdir: Option<PathBuf>,
    pub update_timeout: Option<Duration>,
}

impl Config {
    /// Read `.env` (without overriding the environment), then the environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        let cwd = env::current_dir()?;
        Self::from_lookup(&cwd, |key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Keys are tried upper-case, then lower-case.
    pub fn from_lookup(cwd: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).or_else(|| lookup(&key.to_lowercase()));

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("BOT_TOKEN environment variable is required".to_string())
            })?;

        let admin_chats = AdminAllowList::new(parse_id_list(
            get("BOT_ADMIN_CHATS").as_deref().unwrap_or(""),
        )?);

        let help_text = get("TXT_HELP")
            .and_then(non_empty)
            .map(|s| s.replace("\\n", "\n"))
            .unwrap_or_else(|| DEFAULT_HELP_TEXT.to_string());

        let debug = get("DEBUG").map(|s| parse_bool(&s)).unwrap_or(false);

        let restart_file = get("RESTART_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("restart.json"));
        let restart_file = if restart_file.is_absolute() {
            restart_file
        } else {
            cwd.join(restart_file)
        };
        let restart_mode = get("RESTART_MODE")
            .map(|s| s.parse::<RestartMode>())
            .transpose()?
            .unwrap_or_default();

        let update_command: Vec<String> = get("UPDATE_COMMAND")
            .and_then(non_empty)
            .unwrap_or_else(|| "git pull".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let update_workdir = get("UPDATE_WORKDIR").and_then(non_empty).map(PathBuf::from);
        let update_timeout = match get("UPDATE_TIMEOUT_SECS").and_then(non_empty) {
            None => None,
            Some(s) => {
                let secs = s.trim().parse::<u64>().map_err(|_| {
                    Error::Config(format!("UPDATE_TIMEOUT_SECS is not a number: {s}"))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        Ok(Self {
            bot_token,
            admin_chats,
            help_text,
            debug,
            restart_file,
            restart_mode,
            update_command,
            update_workdir,
            update_timeout,
        })
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("admin_chats", &self.admin_chats)
            .field("help_text", &self.help_text)
            .field("debug", &self.debug)
            .field("restart_file", &self.restart_file)
            .field("restart_mode", &self.restart_mode)
            .field("update_command", &self.update_command)
            .field("update_workdir", &self.update_workdir)
            .field("update_timeout", &self.update_timeout)
            .finish()
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `1,2,3` or `[1, 2, 3]`.
fn parse_id_list(v: &str) -> Result<Vec<i64>> {
    let v = v.trim();
    let v = v
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(v);

    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("BOT_ADMIN_CHATS: invalid chat id `{s}`")))
        })
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
