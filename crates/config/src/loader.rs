use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::PagekeeperConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "pagekeeper.toml",
    "pagekeeper.yaml",
    "pagekeeper.yml",
    "pagekeeper.json",
];

/// Environment variable that overrides `telegram.token`.
pub const TOKEN_ENV: &str = "PAGEKEEPER_TELEGRAM_TOKEN";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PagekeeperConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./pagekeeper.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/pagekeeper.{toml,yaml,yml,json}`
///
/// Returns `PagekeeperConfig::default()` if no config file is found or the
/// one found does not parse.
pub fn discover_and_load() -> PagekeeperConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    PagekeeperConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// The user-global config directory (`~/.config/pagekeeper/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// The user data directory, home of the SQLite database by default.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "pagekeeper")
}

/// Apply environment overrides on top of a loaded config.
///
/// `PAGEKEEPER_TELEGRAM_TOKEN` replaces the token when set and non-empty.
pub fn apply_env_overrides(config: &mut PagekeeperConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(
    config: &mut PagekeeperConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        debug!("telegram token taken from {TOKEN_ENV}");
        config.telegram.token = Secret::new(token);
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PagekeeperConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
