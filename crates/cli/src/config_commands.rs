use {
    anyhow::Result,
    clap::Subcommand,
    pagekeeper_config::{PagekeeperConfig, Severity, ValidationResult, validate},
};

use crate::Cli;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and report errors/warnings.
    Check,
    /// Print the effective configuration (token redacted).
    Show,
    /// Print the path of the config file in use.
    Path,
}

pub fn handle_config(action: &ConfigAction, cli: &Cli) -> Result<()> {
    match action {
        ConfigAction::Check => check(cli),
        ConfigAction::Show => {
            let config = crate::load_config(cli)?;
            println!("{}", serde_json::to_string_pretty(&redacted(&config)?)?);
            Ok(())
        },
        ConfigAction::Path => {
            match config_path(cli) {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("No config file found; defaults are in use."),
            }
            Ok(())
        },
    }
}

fn config_path(cli: &Cli) -> Option<std::path::PathBuf> {
    cli.config
        .clone()
        .or_else(pagekeeper_config::find_config_file)
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(cli: &Cli) -> Result<()> {
    match config_path(cli) {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let config = crate::load_config(cli)?;
    let result = validate(&config);
    print_diagnostics(&result);

    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_diagnostics(result: &ValidationResult) {
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }
}

/// The config as JSON with the bot token masked.
fn redacted(config: &PagekeeperConfig) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(config)?;
    if let Some(token) = value.pointer_mut("/telegram/token")
        && token.as_str().is_some_and(|t| !t.is_empty())
    {
        *token = serde_json::Value::String("[REDACTED]".into());
    }
    Ok(value)
}
