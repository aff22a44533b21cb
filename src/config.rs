use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Messaging bot API token. Required; startup fails without it.
    #[serde(default)]
    pub bot_token: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Seconds between poll cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Upper bound on candidates collected per probe cycle.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Pause between consecutive remote calls within one probe.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("soundwatch");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("soundwatch.db").to_string_lossy().to_string()
}

fn default_check_interval() -> u64 {
    1800
}

fn default_max_results() -> usize {
    20
}

fn default_request_delay() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            db_path: default_db_path(),
            check_interval_secs: default_check_interval(),
            max_results: default_max_results(),
            request_delay_ms: default_request_delay(),
        }
    }
}

impl Config {
    /// Loads the config file if present, applies environment overrides,
    /// and rejects startup when no bot token is configured.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file()?;

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.is_empty() {
                config.bot_token = token;
            }
        }
        if let Ok(path) = std::env::var("DB_PATH") {
            if !path.is_empty() {
                config.db_path = path;
            }
        }
        if let Ok(interval) = std::env::var("CHECK_INTERVAL") {
            config.check_interval_secs = interval.parse().map_err(|_| {
                AppError::Config(format!(
                    "CHECK_INTERVAL must be a number of seconds, got '{interval}'"
                ))
            })?;
        }

        if config.bot_token.is_empty() {
            return Err(AppError::Config(
                "bot_token is not set; add it to config.toml or export BOT_TOKEN".to_string(),
            ));
        }

        Ok(config)
    }

    fn from_file() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("soundwatch")
            .join("config.toml")
    }
}
