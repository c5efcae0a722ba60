//! Bot configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Configuration is
//! layered: stock defaults, then the user's config file, then environment
//! variables.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [telegram]
//! token = ""                            # Bot token (required for `run`)
//! api_url = "https://api.telegram.org"  # Bot API base URL
//! poll_timeout_secs = 30                # Long-poll timeout (max 50)
//!
//! [emoji]
//! tile_size = 100                       # Tile edge in pixels
//! placeholder = "😀"                    # Emoji every tile is registered under
//!
//! [storage]
//! temp_root = "."                       # Where per-user work dirs are created
//! temp_dir_prefix = "temp_"             # Work dir name is {prefix}{user_id}
//! session_ttl_secs = 3600               # Drop unfinished sessions after this (0 = never)
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Key |
//! |---|---|
//! | `BOT_TOKEN` | `telegram.token` |
//! | `TELEGRAM_API_URL` | `telegram.api_url` |
//! | `EMOJI_SIZE` | `emoji.tile_size` |
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Largest accepted tile edge.
pub const MAX_TILE_SIZE: u32 = 512;
/// Telegram caps `getUpdates` long polling at 50 seconds.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Bot configuration loaded from `config.toml`.
///
/// All fields have defaults; a config file only specifies overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Bot API access.
    pub telegram: TelegramConfig,
    /// Tile output settings.
    pub emoji: EmojiConfig,
    /// Per-user temporary storage.
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegramConfig {
    pub token: String,
    pub api_url: String,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmojiConfig {
    pub tile_size: u32,
    pub placeholder: String,
}

impl Default for EmojiConfig {
    fn default() -> Self {
        Self {
            tile_size: crate::imaging::DEFAULT_TILE_SIZE,
            placeholder: crate::pack::DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub temp_root: PathBuf,
    pub temp_dir_prefix: String,
    pub session_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_root: PathBuf::from("."),
            temp_dir_prefix: "temp_".to_string(),
            session_ttl_secs: 3600,
        }
    }
}

impl StorageConfig {
    /// Work directory of one user: `{temp_root}/{prefix}{user_id}`.
    pub fn work_dir_for(&self, user_id: i64) -> PathBuf {
        self.temp_root
            .join(format!("{}{}", self.temp_dir_prefix, user_id))
    }

    /// How long an unfinished session may sit idle; `None` keeps it forever.
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

impl BotConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.emoji.tile_size == 0 || self.emoji.tile_size > MAX_TILE_SIZE {
            return Err(ConfigError::Validation(format!(
                "emoji.tile_size must be 1-{MAX_TILE_SIZE}"
            )));
        }
        if self.emoji.placeholder.trim().is_empty() {
            return Err(ConfigError::Validation(
                "emoji.placeholder must not be empty".into(),
            ));
        }
        let prefix = &self.storage.temp_dir_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "storage.temp_dir_prefix must be non-empty and contain no path separators".into(),
            ));
        }
        if self.telegram.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "telegram.poll_timeout_secs must be at most {MAX_POLL_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }

    /// The bot cannot start without a token; the offline commands can.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        let token = self.telegram.token.trim();
        if token.is_empty() {
            return Err(ConfigError::Validation(
                "telegram.token is not set (config file or BOT_TOKEN)".into(),
            ));
        }
        Ok(token)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("BOT_TOKEN") {
            self.telegram.token = token.trim().to_string();
        }
        if let Some(url) = get("TELEGRAM_API_URL") {
            self.telegram.api_url = url.trim().to_string();
        }
        if let Some(size) = get("EMOJI_SIZE") {
            self.emoji.tile_size = size.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("EMOJI_SIZE must be an integer, got {size:?}"))
            })?;
        }
        Ok(())
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    // Plain strings, integers and tables only; serialization cannot fail.
    toml::Value::try_from(BotConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::Table::new()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BotConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BotConfig = merged.try_into()?;
    Ok(config)
}

/// Load the effective configuration.
///
/// Merges the file at `config_path` (if present) on top of stock defaults,
/// applies environment overrides, and validates the result.
pub fn load_config(config_path: &Path) -> Result<BotConfig, ConfigError> {
    let overlay = load_raw_config(config_path)?;
    let mut config = resolve_config(stock_defaults_value(), overlay)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# emoji-grid Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Telegram Bot API
# ---------------------------------------------------------------------------
[telegram]
# Bot token from @BotFather. Required by `emoji-grid run`.
# The BOT_TOKEN environment variable overrides this value.
token = ""

# Base URL of the Bot API server (TELEGRAM_API_URL overrides).
api_url = "https://api.telegram.org"

# Long-poll timeout for getUpdates, in seconds (0-50).
poll_timeout_secs = 30

# ---------------------------------------------------------------------------
# Emoji tiles
# ---------------------------------------------------------------------------
[emoji]
# Edge length of every square tile, in pixels (1-512).
# Telegram custom emoji are 100x100. EMOJI_SIZE overrides.
tile_size = 100

# Emoji each tile is registered under in the published pack.
placeholder = "😀"

# ---------------------------------------------------------------------------
# Temporary storage
# ---------------------------------------------------------------------------
[storage]
# Directory under which per-user work directories are created.
temp_root = "."

# Work directory name is {temp_dir_prefix}{user_id}.
temp_dir_prefix = "temp_"

# Seconds before a session that never reached the padding step is dropped
# together with its work directory. 0 keeps sessions until the next photo.
session_ttl_secs = 3600
"##
}
