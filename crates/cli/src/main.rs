mod config_commands;
mod run;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    pagekeeper_config::PagekeeperConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "pagekeeper", about = "Pagekeeper: a Telegram bot for your read-later links")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of searching the standard locations.
    #[arg(long, global = true, env = "PAGEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "PAGEKEEPER_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start polling Telegram (default when no subcommand is provided).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config named on the command line, or discover one, then apply
/// environment overrides.
fn load_config(cli: &Cli) -> anyhow::Result<PagekeeperConfig> {
    let mut config = match &cli.config {
        Some(path) => pagekeeper_config::load_config(path)?,
        None => pagekeeper_config::discover_and_load(),
    };
    pagekeeper_config::apply_env_overrides(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match &cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "pagekeeper starting");
            let config = load_config(&cli)?;
            let data_dir = cli
                .data_dir
                .clone()
                .unwrap_or_else(pagekeeper_config::data_dir);
            run::run_bot(config, &data_dir).await
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action, &cli),
    }
}
