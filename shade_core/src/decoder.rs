//! Data-point decoder.
//!
//! Turns a `RawReport` into a typed `DecodedEvent` and keeps the per-session
//! record of every data point seen. Decoding is total: malformed input
//! becomes `NoOp`, never an error.
use std::collections::BTreeMap;

use crate::report::RawReport;

pub const POSITION_DP: u8 = 3;
pub const BATTERY_STATUS_DP: u8 = 12;
pub const BATTERY_PERCENT_DP: u8 = 13;
/// Ids in this range that nothing else claims go to the passive classifier.
pub const PROBE_CANDIDATE_DPS: std::ops::Range<u8> = 5..16;

/// Largest value on the shadow's half-percent battery scale.
pub const BATTERY_HALF_PERCENT_MAX: u8 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSample {
    /// Milliseconds since the session epoch.
    pub t_ms: u64,
    /// Lift percentage, 0..=100.
    pub value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReport {
    pub percent: u8,
}

impl BatteryReport {
    /// Convert to the shadow's half-percent units, capped at 200.
    pub fn to_half_percent(self) -> u8 {
        let doubled = u16::from(self.percent) * 2;
        doubled.min(u16::from(BATTERY_HALF_PERCENT_MAX)) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    Position(PositionSample),
    Battery(BatteryReport),
    BatteryStatus { low: bool },
    /// Not an error. `probe_candidate` marks ids the classifier should see.
    Unknown { dp: u8, probe_candidate: bool },
    /// Malformed or out-of-range input, discarded.
    NoOp,
    /// Function tag is not a data report; host handles it.
    PassThrough,
}

/// Last sighting of a data point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDataPoint {
    pub dp: u8,
    pub payload: Vec<u8>,
    pub tag: u8,
    pub last_seen_ms: u64,
}

/// Classify one report without touching any state.
pub fn decode_report(report: &RawReport, t_ms: u64) -> DecodedEvent {
    if !report.function().is_decoded() {
        return DecodedEvent::PassThrough;
    }
    let p = &report.payload;
    match report.dp {
        POSITION_DP => match p.get(4) {
            Some(&value) if value <= 100 => {
                DecodedEvent::Position(PositionSample { t_ms, value })
            }
            Some(&value) => {
                tracing::trace!(dp = report.dp, value, "position out of range, discarded");
                DecodedEvent::NoOp
            }
            None => malformed(report),
        },
        BATTERY_STATUS_DP => match p.get(1) {
            Some(&b) => DecodedEvent::BatteryStatus { low: b != 0 },
            None => malformed(report),
        },
        BATTERY_PERCENT_DP => match p.get(4) {
            Some(&percent) if percent <= 100 => {
                DecodedEvent::Battery(BatteryReport { percent })
            }
            Some(&value) => {
                tracing::trace!(dp = report.dp, value, "battery out of range, discarded");
                DecodedEvent::NoOp
            }
            None => malformed(report),
        },
        dp => DecodedEvent::Unknown {
            dp,
            probe_candidate: PROBE_CANDIDATE_DPS.contains(&dp),
        },
    }
}

fn malformed(report: &RawReport) -> DecodedEvent {
    tracing::trace!(
        dp = report.dp,
        len = report.payload.len(),
        "malformed payload, discarded"
    );
    DecodedEvent::NoOp
}

/// Stateful decoder owning the discovered data point map.
#[derive(Debug, Default)]
pub struct Decoder {
    discovered: BTreeMap<u8, DiscoveredDataPoint>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `report` and record it when its tag is a data report.
    pub fn decode(&mut self, report: &RawReport, t_ms: u64) -> DecodedEvent {
        if !report.function().is_decoded() {
            tracing::trace!(dp = report.dp, tag = report.tag, "pass-through tag");
            return DecodedEvent::PassThrough;
        }
        self.discovered.insert(
            report.dp,
            DiscoveredDataPoint {
                dp: report.dp,
                payload: report.payload.clone(),
                tag: report.tag,
                last_seen_ms: t_ms,
            },
        );
        let event = decode_report(report, t_ms);
        tracing::debug!(dp = report.dp, ?event, "decoded");
        event
    }

    pub fn discovered(&self) -> &BTreeMap<u8, DiscoveredDataPoint> {
        &self.discovered
    }
}
