//! States and per-event outcomes reported by a device session.

use crate::probe::ProbeHint;

/// Position stabilizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizerState {
    /// No pending samples.
    Idle,
    /// Inside the post-command cooldown; samples are dropped.
    Cooling,
    /// Samples are in the window but have not settled.
    Collecting,
    /// A value was just accepted. The next event returns to Idle or Collecting.
    Settled,
}

/// What the stabilizer did with one position sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Arrived inside the cooldown and was discarded.
    DroppedCooldown,
    /// Appended; not enough stable recent samples yet.
    Collecting,
    /// Recent samples are stable but the candidate is within hysteresis of
    /// the current stable position. Nothing is published.
    Held(u8),
    /// Candidate accepted as the new stable position.
    Settled(u8),
}

/// Result of handling one inbound report in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    PassThrough,
    NoOp,
    Position(SampleOutcome),
    /// Battery percentage forwarded in half-percent units.
    Battery { half_percent: u8 },
    BatteryStatus { low: bool },
    Unknown { dp: u8, hint: Option<ProbeHint> },
}
