//! `shade probe`: run one calibration probe against the simulated device.

use std::sync::atomic::Ordering;

use serde_json::json;
use shade_core::mocks::InMemoryShadow;
use shade_core::{DeviceSession, ProbeReport};
use shade_hardware::SimulatedTransport;
use shade_traits::MonotonicClock;

use crate::cli::ProbeCommand;

pub fn run_probe(cfg: &shade_config::Config, which: ProbeCommand, json: bool) -> eyre::Result<()> {
    let clock = MonotonicClock::new();
    let session = DeviceSession::builder()
        .with_config(cfg)
        .with_clock(clock)
        .with_transport(SimulatedTransport::from_env(clock))
        .with_shadow(InMemoryShadow::new())
        .build()?;

    let handle = match which {
        ProbeCommand::CalibrationTime { seconds } => session.set_calibration_time(seconds)?,
        ProbeCommand::MotorSpeed { speed } => session.set_motor_speed(speed)?,
        ProbeCommand::TriggerCalibration => session.trigger_calibration()?,
    };

    let cancel = handle.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler; probe cannot be cancelled");
    }

    let report = handle.join()?;
    if json {
        println!("{}", report_json(&report));
    } else {
        print_report(&report);
    }
    Ok(())
}

fn report_json(r: &ProbeReport) -> serde_json::Value {
    json!({
        "target": r.target.to_string(),
        "abandoned": r.abandoned,
        "attempts": r
            .attempts
            .iter()
            .map(|a| json!({
                "dp": a.command.dp,
                "value": a.command.value,
                "at_ms": a.at_ms,
                "error": a.error,
            }))
            .collect::<Vec<_>>(),
    })
}

fn print_report(r: &ProbeReport) {
    for a in &r.attempts {
        match &a.error {
            None => println!(
                "dp {} <- {} at {} ms: ok",
                a.command.dp, a.command.value, a.at_ms
            ),
            Some(e) => println!(
                "dp {} <- {} at {} ms: failed ({e})",
                a.command.dp, a.command.value, a.at_ms
            ),
        }
    }
    if r.abandoned {
        println!("{} probe cancelled after {} attempts", r.target, r.attempts.len());
    } else {
        println!("{} probe complete ({} attempts)", r.target, r.attempts.len());
    }
}
