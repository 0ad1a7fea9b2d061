//! Command-line interface.

pub mod run;

use clap::Parser;
use std::path::PathBuf;

use crate::infrastructure::logging::LoggerImpl;

/// Relay record identifiers through the cache into the outbound queue
#[derive(Parser, Debug)]
#[command(name = "record-relay", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to .record-relay/config.yaml and local.yaml)
    #[arg(short, long, env = "RECORD_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// File with one record identifier per line, `-` for stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Validate and print the effective configuration, then exit
    #[arg(long)]
    pub check_config: bool,
}

/// Report a fatal error and exit with status 1.
///
/// The logger, if any, is dropped first so buffered file output is flushed.
pub fn handle_error(err: anyhow::Error, logger: Option<LoggerImpl>) -> ! {
    tracing::error!(error = format!("{err:#}"), "fatal error, terminating");
    drop(logger);
    eprintln!("Error: {err:#}");
    std::process::exit(1);
}
