mod cli;
mod commands;
mod error_fmt;
mod session;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("color-eyre init failed: {e}");
    }
    let args = Cli::parse();
    let _ = JSON_MODE.set(args.json);

    if let Err(e) = real_main(&args) {
        if *JSON_MODE.get().unwrap_or(&false) {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}

fn real_main(args: &Cli) -> eyre::Result<()> {
    let (cfg, from_file) = load_config(&args.config)?;
    init_logging(args, &cfg.logging)?;
    if from_file {
        tracing::info!(path = %args.config.display(), "config loaded");
    } else {
        tracing::info!(path = %args.config.display(), "config file absent, using defaults");
    }
    cfg.validate()?;

    match &args.cmd {
        Commands::Run { mode } => session::run_session(&cfg, *mode, args.json),
        Commands::SelfCheck => session::self_check(&cfg, args.json),
    }
}

fn load_config(path: &Path) -> eyre::Result<(carousel_config::Config, bool)> {
    if path.exists() {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("read config {}", path.display()))?;
        let cfg = carousel_config::load_toml(&text).wrap_err("parse config")?;
        Ok((cfg, true))
    } else {
        Ok((carousel_config::Config::default(), false))
    }
}

/// Console logging goes to stderr so the report lines own stdout. An
/// optional JSON-lines file sink is added when `logging.file` is set.
fn init_logging(args: &Cli, logging: &carousel_config::Logging) -> eyre::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = logging
        .level
        .clone()
        .unwrap_or_else(|| args.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_else(|| "carousel.log".into());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        if args.json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .try_init()
        }
    } else if args.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| eyre::eyre!("init logging: {e}"))
}
