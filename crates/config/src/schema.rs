//! Config schema types.

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagekeeperConfig {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub consumer: ConsumerSettings,
    pub metrics: MetricsConfig,
}

/// Telegram bot connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-polling timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u32,

    /// Bot API base URL. Only needed for a self-hosted Bot API server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl TelegramConfig {
    /// True when a non-blank token is configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
            api_url: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Which page store backs the bot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    /// Pages vanish on restart. Handy for trying the bot out.
    Memory,
}

/// Page storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file. Relative paths resolve against the data dir.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("pagekeeper.db"),
        }
    }
}

/// Ingestion loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsumerSettings {
    /// Maximum events fetched per poll (Telegram accepts 1..=100).
    pub batch_size: usize,
    /// Pause after an empty batch, in milliseconds.
    pub idle_interval_ms: u64,
    /// First delay after a failed fetch. `0` retries immediately.
    pub fetch_backoff_initial_ms: u64,
    /// Upper bound for the doubling fetch delay.
    pub fetch_backoff_max_ms: u64,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_interval_ms: 1_000,
            fetch_backoff_initial_ms: 500,
            fetch_backoff_max_ms: 30_000,
        }
    }
}

/// Metrics export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Prometheus scrape endpoint address.
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "127.0.0.1:9464".into(),
        }
    }
}
