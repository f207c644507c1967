//! PayMe main entry point

use anyhow::Context;
use clap::Parser;
use payme_api::{start_server, AppState};
use payme_backend::Backend;
use payme_config::{Config, ConfigError};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "payme")]
#[command(version = "0.1.0")]
#[command(about = "A small self-hosted expense tracker for household payments", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print a commented default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

/// Load the configuration file; a missing file falls back to defaults
fn load_config(path: &Path) -> anyhow::Result<(Config, bool)> {
    match Config::load(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::FileNotFound { .. }) => {
            let mut config = Config::default();
            config.apply_env(|key| std::env::var(key).ok());
            config.validate().context("Invalid configuration from environment")?;
            Ok((config, false))
        }
        Err(e) => {
            eprintln!("{}", e.to_details());
            Err(e).with_context(|| format!("Failed to load {}", path.display()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let (config, from_file) = load_config(&args.config)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str())).init();

    if from_file {
        log::info!("Config loaded from {}", args.config.display());
    } else {
        log::warn!("Config file {} not found, using defaults", args.config.display());
    }

    let backend = Backend::from_config(&config.backend).context("Failed to initialize backend")?;
    let state = AppState::new(config, backend);
    start_server(state).await
}
