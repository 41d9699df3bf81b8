//! Offline replay of a recorded trace through a session.
use shade_config::{TraceEvent, TraceRow};
use shade_traits::{ManualClock, VendorCommand};

use crate::report::RawReport;
use crate::session::DeviceSession;
use crate::status::{ReportOutcome, SampleOutcome};
use crate::translator::CoverCommand;
use crate::util::ms;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Reports and frames fed to the decoder.
    pub reports: usize,
    pub pass_through: usize,
    pub discarded: usize,
    pub dropped_in_cooldown: usize,
    /// `(t_ms, position)` for every accepted stable position.
    pub stable_positions: Vec<(u64, u8)>,
    pub last_battery_half_percent: Option<u8>,
    pub battery_low: Option<bool>,
    pub commands: usize,
    pub command_failures: usize,
    /// Vendor commands that were sent successfully.
    pub sent: Vec<VendorCommand>,
    pub hints: usize,
    pub discovered: usize,
}

fn command_of(event: &TraceEvent) -> Option<CoverCommand> {
    match event {
        TraceEvent::Open => Some(CoverCommand::Open),
        TraceEvent::Close => Some(CoverCommand::Close),
        TraceEvent::Stop => Some(CoverCommand::Stop),
        TraceEvent::GoTo { percent } => Some(CoverCommand::GoToLiftPercentage(*percent)),
        TraceEvent::Report { .. } | TraceEvent::Frame { .. } => None,
    }
}

/// Drive `session` through `rows`, moving `clock` to each row's time.
///
/// Row times are relative to the clock's offset when replay starts, so a
/// session built on the same clock right before sees them unchanged.
pub fn replay(
    session: &mut DeviceSession,
    clock: &ManualClock,
    rows: &[TraceRow],
) -> ReplaySummary {
    let base = clock.offset_ms();
    let mut summary = ReplaySummary::default();

    for row in rows {
        clock.set_offset(ms(base.saturating_add(row.t_ms)));

        if let Some(cmd) = command_of(&row.event) {
            summary.commands += 1;
            match session.handle_command(cmd) {
                Ok(t) => summary.sent.push(t.command),
                Err(e) => {
                    tracing::warn!(t_ms = row.t_ms, %cmd, error = %e, "replayed command failed");
                    summary.command_failures += 1;
                }
            }
            continue;
        }

        let outcome = match &row.event {
            TraceEvent::Report { dp, tag, payload } => {
                session.handle_report(&RawReport::new(*dp, *tag, payload.clone()))
            }
            TraceEvent::Frame { tag, bytes } => session.handle_frame(*tag, bytes),
            _ => continue,
        };
        summary.reports += 1;
        match outcome {
            ReportOutcome::PassThrough => summary.pass_through += 1,
            ReportOutcome::NoOp => summary.discarded += 1,
            ReportOutcome::Position(SampleOutcome::DroppedCooldown) => {
                summary.dropped_in_cooldown += 1;
            }
            ReportOutcome::Position(SampleOutcome::Settled(p)) => {
                summary.stable_positions.push((row.t_ms, p));
            }
            ReportOutcome::Battery { half_percent } => {
                summary.last_battery_half_percent = Some(half_percent);
            }
            ReportOutcome::BatteryStatus { low } => summary.battery_low = Some(low),
            ReportOutcome::Position(_) | ReportOutcome::Unknown { .. } => {}
        }
    }

    summary.hints = session.hints().len();
    summary.discovered = session.discovered_data_points().len();
    tracing::debug!(?summary, "replay finished");
    summary
}
