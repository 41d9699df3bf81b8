mod cli;
mod command;
mod error_fmt;
mod probe;
mod replay;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use shade_core::mocks::InMemoryShadow;
use shade_core::{DeviceSession, ShadeError};
use shade_hardware::SimulatedTransport;
use shade_traits::MonotonicClock;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    // Dropping the guard flushes the file sink.
    let _file_guard = init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    let res = match cli.cmd {
        Commands::Replay { trace } => replay::run_replay(&cfg, &trace, cli.json),
        Commands::Command {
            action,
            percent,
            current,
        } => command::run_command(&cfg, action, percent, current, cli.json),
        Commands::Probe { target } => probe::run_probe(&cfg, target, cli.json),
        Commands::SelfCheck => self_check(&cfg, cli.json),
    };
    if let Err(e) = &res {
        tracing::error!(error = %e, "command failed");
    }
    res
}

/// Parse and validate the TOML config, or use defaults when no file is given.
fn load_config(path: Option<&Path>) -> eyre::Result<shade_config::Config> {
    let Some(path) = path else {
        return Ok(shade_config::Config::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg: shade_config::Config =
        toml::from_str(&text).map_err(|e| ShadeError::Config(e.message().to_string()))?;
    cfg.validate()
        .map_err(|e| ShadeError::Config(e.to_string()))?;
    Ok(cfg)
}

/// Console logging to stderr (pretty or JSON), plus an optional JSON-lines
/// file sink from `[logging]`.
fn init_tracing(
    json: bool,
    level: &str,
    logging: &shade_config::Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let mut guard = None;
    let file = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
            let name = path
                .file_name()
                .ok_or_else(|| ShadeError::Config(format!("logging.file {file:?} has no file name")))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            let file_level = logging.level.as_deref().unwrap_or("info");
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(EnvFilter::new(file_level)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))?;
    Ok(guard)
}

fn self_check(cfg: &shade_config::Config, json: bool) -> eyre::Result<()> {
    let clock = MonotonicClock::new();
    let transport = std::sync::Arc::new(SimulatedTransport::from_env(clock));
    let session = DeviceSession::builder()
        .with_config(cfg)
        .with_clock(clock)
        .with_transport(transport.clone())
        .with_shadow(InMemoryShadow::new())
        .build()?;
    if !transport.is_connected() {
        return Err(ShadeError::Disconnected.into());
    }
    tracing::info!(name = ?session.name(), state = ?session.stabilizer_state(), "self-check ok");
    if json {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "device": session.name() })
        );
    } else {
        println!("OK");
    }
    Ok(())
}
