//! Configuration for eyebot.
//!
//! Paths are derived from a single state directory; everything else comes
//! from environment variables, optionally loaded from an env file first.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.eyebot/
//! ├── config/
//! │   └── .env.local    # Secrets (bot token, API keys)
//! └── state/
//!     ├── activity.json # Per-user interaction log
//!     └── pairings.json # Paired chat ids
//! ```
//!
//! # Environment Variables
//!
//! - `EYEBOT_STATE_DIR`: Override the base state directory
//! - `BOT_TOKEN` (or `TELEGRAM_BOT_TOKEN`): Telegram bot token, required
//! - `ADMIN_ID`: Telegram user id of the operator, required
//! - `WHATSAPP_NUMBER`: Number used to build complaint hand-off links
//! - `PORT`: Keep-alive / webhook listen port (default: 10000)
//! - `WEBHOOK_URL`: Public base URL; switches the bot to webhook mode
//! - `EYEBOT_ACTIVITY_POLICY`: `message` (default) or `command`
//! - `EYEBOT_REQUIRE_PAIRING`: Gate commands behind `/pair` (default: true)
//! - `EYEBOT_PAIRING_CODE`: Shared code `/pair` must be given
//! - `EYEBOT_STORE_LOCKING`: Lock store files per update (default: true)
//! - `OPENROUTER_API_KEY`: Enables language-model answers for /requests
//! - `OPENROUTER_MODEL`: Model for those answers (default: `DEFAULT_MODEL`)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::answer::DEFAULT_MODEL;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "EYEBOT_STATE_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".eyebot";

/// Default port for the keep-alive responder.
pub const DEFAULT_PORT: u16 = 10000;

const CONFIG_SUBDIR: &str = "config";
const STATE_SUBDIR: &str = "state";

/// Errors raised while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} env var is missing")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// When to write an entry to the activity log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivityPolicy {
    /// Every inbound message, command or not.
    #[default]
    EveryMessage,
    /// Only messages that parsed as a known command.
    CommandsOnly,
}

impl FromStr for ActivityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "message" | "messages" | "every_message" => Ok(Self::EveryMessage),
            "command" | "commands" | "commands_only" => Ok(Self::CommandsOnly),
            other => Err(format!("unknown activity policy: {other}")),
        }
    }
}

/// Runtime configuration for the bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub admin_id: i64,
    pub whatsapp_number: Option<String>,
    pub port: u16,
    pub webhook_url: Option<Url>,
    pub activity_policy: ActivityPolicy,
    pub require_pairing: bool,
    pub pairing_code: Option<String>,
    pub store_locking: bool,
    pub state_dir: PathBuf,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
}

impl BotConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token = get("BOT_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let admin_id = parse_var(&get, "ADMIN_ID")?.ok_or(ConfigError::Missing("ADMIN_ID"))?;
        let port = parse_var(&get, "PORT")?.unwrap_or(DEFAULT_PORT);
        let webhook_url = parse_var(&get, "WEBHOOK_URL")?;
        let activity_policy = parse_var(&get, "EYEBOT_ACTIVITY_POLICY")?.unwrap_or_default();
        let require_pairing = parse_flag(&get, "EYEBOT_REQUIRE_PAIRING")?.unwrap_or(true);
        let store_locking = store_locking_from_lookup(&get)?;

        let state_dir = get(STATE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);

        Ok(Self {
            token,
            admin_id,
            whatsapp_number: get("WHATSAPP_NUMBER").map(|n| n.trim().to_string()),
            port,
            webhook_url,
            activity_policy,
            require_pairing,
            pairing_code: get("EYEBOT_PAIRING_CODE").map(|c| c.trim().to_string()),
            store_locking,
            state_dir,
            openrouter_api_key: get("OPENROUTER_API_KEY").map(|k| k.trim().to_string()),
            openrouter_model: get("OPENROUTER_MODEL")
                .map(|m| m.trim().to_string())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// Whether `user_id` is the configured operator.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id == user_id
    }

    /// Path of the activity log.
    pub fn activity_file(&self) -> PathBuf {
        activity_file(&self.state_dir)
    }

    /// Path of the pairing set.
    pub fn pairing_file(&self) -> PathBuf {
        pairing_file(&self.state_dir)
    }
}

fn parse_var<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

fn parse_flag<G>(get: &G, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        })
        .transpose()
}

/// Reads `EYEBOT_STORE_LOCKING` through `lookup` (default: true).
///
/// Maintenance commands need this without the rest of [`BotConfig`].
pub fn store_locking_from_lookup<F>(lookup: F) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    Ok(parse_flag(&get, "EYEBOT_STORE_LOCKING")?.unwrap_or(true))
}

/// Reads `EYEBOT_STORE_LOCKING` from the process environment.
pub fn store_locking_from_env() -> Result<bool, ConfigError> {
    store_locking_from_lookup(|name| std::env::var(name).ok())
}

/// The state directory used when `EYEBOT_STATE_DIR` is not set.
///
/// `~/.eyebot` if a home directory is available, `.eyebot` otherwise.
pub fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(DEFAULT_STATE_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

/// Get the eyebot state directory from the process environment.
pub fn state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_state_dir())
}

/// Get the activity log path under `state_dir`.
pub fn activity_file(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_SUBDIR).join("activity.json")
}

/// Get the pairing file path under `state_dir`.
///
/// The pairing file stores the ids of chats allowed to use gated commands.
pub fn pairing_file(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_SUBDIR).join("pairings.json")
}

/// Get the .env.local file path.
///
/// Environment file for secrets (bot token, API keys).
pub fn env_file() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR).join(".env.local")
}

/// Loads env files into the process environment.
///
/// The state directory's `config/.env.local` wins, then `.env.local` or
/// `.env` in the working directory. Variables already set are kept.
pub fn load_env_files() {
    let env_path = env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());
}
