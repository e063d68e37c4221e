//! Semantic validation of a loaded configuration.
//!
//! Parsing already rejects malformed files; this catches values that parse
//! but cannot work, so `pagekeeper config check` can report them before the
//! bot starts polling.

use std::net::SocketAddr;

use crate::schema::{PagekeeperConfig, StorageBackend};

/// Largest `getUpdates` limit Telegram accepts.
pub const MAX_BATCH_SIZE: usize = 100;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "consumer.batch_size"
    pub path: &'static str,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check a configuration for values that would stop the bot from working.
#[must_use]
pub fn validate(config: &PagekeeperConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !config.telegram.has_token() {
        result.push(
            Severity::Error,
            "telegram.token",
            "no bot token; set it in the config file or PAGEKEEPER_TELEGRAM_TOKEN",
        );
    }

    let consumer = &config.consumer;
    if consumer.batch_size == 0 {
        result.push(Severity::Error, "consumer.batch_size", "must be at least 1");
    } else if consumer.batch_size > MAX_BATCH_SIZE {
        result.push(
            Severity::Warning,
            "consumer.batch_size",
            format!("Telegram caps batches at {MAX_BATCH_SIZE}; larger values are clamped"),
        );
    }

    if consumer.fetch_backoff_initial_ms > consumer.fetch_backoff_max_ms {
        result.push(
            Severity::Error,
            "consumer.fetch_backoff_initial_ms",
            "must not exceed consumer.fetch_backoff_max_ms",
        );
    }

    if consumer.fetch_backoff_initial_ms == 0 {
        result.push(
            Severity::Warning,
            "consumer.fetch_backoff_initial_ms",
            "0 retries failed fetches in a tight loop",
        );
    }

    if config.storage.backend == StorageBackend::Memory {
        result.push(
            Severity::Warning,
            "storage.backend",
            "memory storage loses all saved pages on restart",
        );
    }

    if config.metrics.enabled && config.metrics.listen.parse::<SocketAddr>().is_err() {
        result.push(
            Severity::Error,
            "metrics.listen",
            format!("`{}` is not a socket address", config.metrics.listen),
        );
    }

    result
}
