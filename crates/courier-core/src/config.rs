use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::DEFAULT_BATCH_SIZE;

/// Backoff parameters for one call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Growth factor between consecutive delays (>= 1.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, backoff_multiplier: f64) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            backoff_multiplier,
        }
    }
}

fn default_acquire() -> RetryConfig {
    RetryConfig::new(3, 2000, 2.0)
}

fn default_transform() -> RetryConfig {
    RetryConfig::new(3, 2000, 2.0)
}

fn default_deliver() -> RetryConfig {
    RetryConfig::new(3, 1000, 2.0)
}

fn default_notify() -> RetryConfig {
    RetryConfig::new(2, 1000, 1.5)
}

/// Per-call-site retry policies (`[retry.*]` tables in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_acquire")]
    pub acquire: RetryConfig,
    #[serde(default = "default_transform")]
    pub transform: RetryConfig,
    #[serde(default = "default_deliver")]
    pub deliver: RetryConfig,
    /// Used for best-effort error notices sent to the destination channel.
    #[serde(default = "default_notify")]
    pub notify: RetryConfig,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            acquire: default_acquire(),
            transform: default_transform(),
            deliver: default_deliver(),
            notify: default_notify(),
        }
    }
}

/// Delivery batching (`[delivery]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Items per media-group call; clamped to the transport maximum of 10.
    pub batch_size: usize,
    /// Pause after each successful batch, in milliseconds.
    pub batch_pause_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause_ms: 1000,
        }
    }
}

/// Remote inference endpoint (`[inference]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the generateContent-style API.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Total request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Bot delivery endpoint (`[telegram]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    /// Environment variable holding the bot token.
    pub token_env: String,
    /// Destination chat; may also be given via `chat_id_env`.
    pub chat_id: Option<String>,
    pub chat_id_env: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org/".to_string(),
            token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id: None,
            chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/courier/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Directory the acquisition stage reads images from.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    /// Instruction sent with the images to the inference endpoint.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Where fallback bundles are written; defaults to the XDG data dir.
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

fn default_prompt() -> String {
    "Summarize what these dashboard screenshots show for today's report.".to_string()
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            prompt: default_prompt(),
            fallback_dir: None,
            delivery: DeliveryConfig::default(),
            retry: RetrySettings::default(),
            inference: InferenceConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl CourierConfig {
    /// Fallback bundle root: configured value or `~/.local/share/courier/fallback`.
    pub fn fallback_root(&self) -> Result<PathBuf> {
        match &self.fallback_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_fallback_dir(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("courier")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

pub fn default_fallback_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("courier")?;
    Ok(xdg_dirs.get_data_home().join("courier").join("fallback"))
}

/// Load configuration from the default location, creating a default file if none exists.
pub fn load_or_init() -> Result<CourierConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CourierConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<CourierConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: CourierConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_sites_are_distinct() {
        let cfg = CourierConfig::default();
        assert_eq!(cfg.retry.acquire, RetryConfig::new(3, 2000, 2.0));
        assert_eq!(cfg.retry.deliver, RetryConfig::new(3, 1000, 2.0));
        assert_eq!(cfg.retry.notify, RetryConfig::new(2, 1000, 1.5));
        assert_eq!(cfg.delivery.batch_size, 5);
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = CourierConfig::default();
        cfg.source_dir = Some(PathBuf::from("/srv/shots"));
        cfg.telegram.chat_id = Some("-100123".to_string());
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CourierConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: CourierConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, CourierConfig::default());
    }

    #[test]
    fn partial_retry_tables_keep_other_defaults() {
        let toml = r#"
            source_dir = "/tmp/shots"

            [delivery]
            batch_size = 8
            batch_pause_ms = 250

            [retry.transform]
            max_retries = 1
            initial_delay_ms = 500
            backoff_multiplier = 3.0
        "#;
        let cfg: CourierConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.source_dir.as_deref(), Some(Path::new("/tmp/shots")));
        assert_eq!(cfg.delivery.batch_size, 8);
        assert_eq!(cfg.retry.transform, RetryConfig::new(1, 500, 3.0));
        assert_eq!(cfg.retry.acquire, RetryConfig::new(3, 2000, 2.0));
        assert_eq!(cfg.retry.notify, RetryConfig::new(2, 1000, 1.5));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "fallback_dir = \"/var/lib/courier\"\n").unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.fallback_root().unwrap(), PathBuf::from("/var/lib/courier"));
    }

    #[test]
    fn load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from(&dir.path().join("nope.toml")).is_err());
    }
}
