//! Configuration loading, env substitution, and validation.
//!
//! Config files: `pagekeeper.toml`, `pagekeeper.yaml`/`.yml`, or
//! `pagekeeper.json`, searched in `./` then the user config directory
//! (`~/.config/pagekeeper/` on Linux).
//!
//! String values may reference the environment as `${VAR}` or
//! `${VAR:-fallback}`.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, data_dir, discover_and_load, find_config_file,
        load_config,
    },
    schema::{
        ConsumerSettings, MetricsConfig, PagekeeperConfig, StorageBackend, StorageConfig,
        TelegramConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
