// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the HODR spectrometer HTTP gateway

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::signal;

use hodr_gateway::config::{self, Config};
use hodr_gateway::daemon::Daemon;

/// HTTP gateway for the HODR spectrometer control daemon
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// HTTP port (default: 8080)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// HTTP listening address (default: 0.0.0.0)
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Directory holding index.html, style.css and favicon.ico
    #[arg(long)]
    www_dir: Option<PathBuf>,

    /// Directory relative data file paths are resolved against (default: ..)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Simulate the instrument instead of connecting to D-Bus
    #[arg(long)]
    mock: bool,

    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }
        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.port,
        args.address.clone(),
        args.www_dir.clone(),
        args.data_dir.clone(),
        args.mock,
    );

    info!("Starting HODR gateway {}", env!("CARGO_PKG_VERSION"));
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, terminating daemon"),
        Err(err) => log::error!("Error waiting for shutdown signal: {}", err),
    }
    daemon.shutdown();
    daemon.join().await?;

    Ok(())
}
