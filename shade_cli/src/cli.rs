//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "shade", version, about = "Motorized blind controller CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON lines, and log as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Standard cover actions accepted by `shade command`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Action {
    Open,
    Close,
    Stop,
    /// Go to a lift percentage (needs --percent)
    Goto,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded CSV trace against a simulated device
    Replay {
        /// Trace file with header `t_ms,event,dp,tag,payload`
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
    },
    /// Issue one cover command and show what is sent
    Command {
        #[arg(value_enum)]
        action: Action,
        /// Target lift percentage for `goto` (0 = open, 100 = closed)
        #[arg(long, value_name = "P")]
        percent: Option<u8>,
        /// Current lift percentage known to the host, used for the prediction
        #[arg(long, value_name = "P")]
        current: Option<u8>,
    },
    /// Write candidate configuration values to every plausible data point
    Probe {
        #[command(subcommand)]
        target: ProbeCommand,
    },
    /// Build a session from the config and report OK
    SelfCheck,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ProbeCommand {
    /// Calibration time in seconds (5..=120)
    CalibrationTime {
        #[arg(long)]
        seconds: u32,
    },
    /// Motor speed (1..=255)
    MotorSpeed {
        #[arg(long)]
        speed: u32,
    },
    /// Ask the device to start a calibration run
    TriggerCalibration,
}
