use std::io::stdout;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nr_cli::commands::report::{self, Output, ReportOptions};
use nr_cli::{Cli, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = cli.path {
        config.log_path = path;
    }
    if let Some(pattern) = cli.pattern {
        config.pattern = pattern;
    }
    tracing::debug!(?config, "loaded configuration");

    let output = if cli.pushover {
        Output::Pushover
    } else if cli.json {
        Output::Json
    } else {
        Output::Text
    };
    let options = ReportOptions {
        night: cli.night,
        silent: cli.silent,
        output,
    };

    report::run(&mut stdout().lock(), options, &config)
}
