//! # carpetas-cli
//!
//! Command tree for the `carpetas` binary. Every invocation opens the
//! folder snapshot and the invoice file named in the configuration, runs
//! one command, and writes both back.

pub mod commands;
pub mod context;
pub mod output;

pub use commands::Cli;
pub use context::CliContext;
pub use output::OutputFormat;
