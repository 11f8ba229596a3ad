//! Carpetas: folder tree and invoice assignment engine.
//!
//! Main entry point: loads configuration, initializes logging, and runs one
//! CLI command against the configured stores.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use carpetas_cli::Cli;
use carpetas_cli::output::print_error;
use carpetas_core::config::AppConfig;
use carpetas_core::error::AppError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = cli.execute(&config).await {
        tracing::debug!(kind = %e.kind, subject = ?e.subject(), "Command failed");
        print_error(&e.to_string());
        std::process::exit(if e.is_domain() { 2 } else { 1 });
    }
}

/// Load configuration from file, environment overlay, and variables
fn load_configuration(config_path: &str) -> Result<AppConfig, AppError> {
    let env = std::env::var("CARPETAS_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(config_path, &env)
}

/// Initialize tracing/logging. Logs go to stderr so command output stays
/// machine-readable.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
