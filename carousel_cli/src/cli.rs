//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "carousel", version, about = "Carousel opacity sampler CLI")]
pub struct Cli {
    /// Path to config TOML (typed); defaults are used when the file is absent
    #[arg(long, value_name = "FILE", default_value = "etc/carousel.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Initial multiplexer mode override from the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    Manual,
    Automatic,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate, then serve operator commands from stdin
    Run {
        /// Start in this mode instead of the configured one
        #[arg(long, value_enum, value_name = "MODE")]
        mode: Option<ModeArg>,
    },
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}
