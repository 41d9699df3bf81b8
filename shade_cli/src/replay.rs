//! `shade replay`: run a recorded trace through a simulated device.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use shade_core::mocks::InMemoryShadow;
use shade_core::{DeviceSession, ReplaySummary, replay};
use shade_hardware::SimulatedTransport;
use shade_traits::ManualClock;

pub fn run_replay(cfg: &shade_config::Config, trace: &Path, json: bool) -> eyre::Result<()> {
    let rows = shade_config::load_trace_csv(trace)?;
    tracing::info!(rows = rows.len(), trace = %trace.display(), "replaying trace");

    let clock = ManualClock::new();
    let shadow = Arc::new(InMemoryShadow::new());
    let mut session = DeviceSession::builder()
        .with_config(cfg)
        .with_clock(clock.clone())
        .with_transport(SimulatedTransport::from_env(clock.clone()))
        .with_shadow(shadow.clone())
        .build()?;

    let summary = replay(&mut session, &clock, &rows);
    let lift_writes = shadow.lift_writes();

    if json {
        println!("{}", summary_json(&summary, &lift_writes));
    } else {
        print_summary(&summary, &lift_writes);
    }
    Ok(())
}

fn summary_json(s: &ReplaySummary, lift_writes: &[u8]) -> serde_json::Value {
    json!({
        "reports": s.reports,
        "pass_through": s.pass_through,
        "discarded": s.discarded,
        "dropped_in_cooldown": s.dropped_in_cooldown,
        "stable_positions": s
            .stable_positions
            .iter()
            .map(|&(t_ms, position)| json!({ "t_ms": t_ms, "position": position }))
            .collect::<Vec<_>>(),
        "battery_half_percent": s.last_battery_half_percent,
        "battery_low": s.battery_low,
        "commands": s.commands,
        "command_failures": s.command_failures,
        "sent": s
            .sent
            .iter()
            .map(|c| json!({ "dp": c.dp, "value": c.value }))
            .collect::<Vec<_>>(),
        "lift_writes": lift_writes,
        "hints": s.hints,
        "discovered": s.discovered,
    })
}

fn print_summary(s: &ReplaySummary, lift_writes: &[u8]) {
    println!(
        "reports: {} ({} pass-through, {} discarded, {} dropped in cooldown)",
        s.reports, s.pass_through, s.discarded, s.dropped_in_cooldown
    );
    for (t_ms, p) in &s.stable_positions {
        println!("stable position {p}% at {t_ms} ms");
    }
    if let Some(b) = s.last_battery_half_percent {
        println!("battery: {b} half-percent");
    }
    if let Some(low) = s.battery_low {
        println!("battery low: {low}");
    }
    println!(
        "commands: {} sent, {} failed",
        s.sent.len(),
        s.command_failures
    );
    println!("lift writes: {lift_writes:?}");
    println!(
        "data points seen: {}, configuration hints: {}",
        s.discovered, s.hints
    );
}
