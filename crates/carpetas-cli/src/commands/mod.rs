//! CLI command definitions and dispatch.

pub mod folder;
pub mod invoice;

use clap::{Parser, Subcommand};

use carpetas_core::config::AppConfig;
use carpetas_core::error::AppError;

use crate::context::CliContext;
use crate::output::OutputFormat;

/// Carpetas: organize invoices into a folder tree
#[derive(Debug, Parser)]
#[command(name = "carpetas", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (extension optional)
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Folder management
    Folder(folder::FolderArgs),
    /// Invoice management and assignment
    Invoice(invoice::InvoiceArgs),
}

impl Cli {
    /// Execute the CLI command against the stores named in `config`
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        let ctx = CliContext::open(config).await?;
        match &self.command {
            Commands::Folder(args) => folder::execute(args, &ctx, self.format).await,
            Commands::Invoice(args) => invoice::execute(args, &ctx, self.format).await,
        }
    }
}
