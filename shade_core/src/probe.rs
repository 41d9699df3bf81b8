//! Calibration prober.
//!
//! The device's configuration data points differ between firmware batches,
//! so writes are tried against every known candidate id in turn. There is no
//! acknowledgement telling which candidate took effect.
//!
//! Each sequence runs on its own thread and can be cancelled. At most one
//! sequence per `ProbeTarget` runs at a time. A passive classifier flags
//! unclaimed data points whose values look like configuration.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use shade_traits::clock::Clock;
use shade_traits::{Transport, VendorCommand};

use crate::config::{ProberCfg, Timeouts};
use crate::decoder::PROBE_CANDIDATE_DPS;
use crate::error::{RangeError, Result, ShadeError};
use crate::hw_error::map_transport_error;
use crate::report::RawReport;

pub const CALIBRATION_TIME_DPS: [u8; 4] = [7, 8, 9, 10];
pub const MOTOR_SPEED_DPS: [u8; 4] = [5, 6, 14, 15];
pub const TRIGGER_CALIBRATION: [(u8, u32); 4] = [(16, 1), (17, 1), (18, 1), (101, 1)];

/// Longest uninterrupted sleep between cancel checks.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeTarget {
    CalibrationTime,
    MotorSpeed,
    TriggerCalibration,
}

impl ProbeTarget {
    pub const ALL: [Self; 3] = [
        Self::CalibrationTime,
        Self::MotorSpeed,
        Self::TriggerCalibration,
    ];

    const fn index(self) -> usize {
        match self {
            Self::CalibrationTime => 0,
            Self::MotorSpeed => 1,
            Self::TriggerCalibration => 2,
        }
    }
}

impl core::fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::CalibrationTime => "calibration-time",
            Self::MotorSpeed => "motor-speed",
            Self::TriggerCalibration => "trigger-calibration",
        })
    }
}

/// Ordered list of writes for one probe sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub target: ProbeTarget,
    pub attempts: Vec<VendorCommand>,
}

impl ProbePlan {
    /// `seconds` must be in 5..=120.
    pub fn calibration_time(seconds: u32) -> std::result::Result<Self, RangeError> {
        RangeError::check("calibration_time_s", i64::from(seconds), 5, 120)?;
        Ok(Self {
            target: ProbeTarget::CalibrationTime,
            attempts: CALIBRATION_TIME_DPS
                .iter()
                .map(|&dp| VendorCommand::new(dp, seconds, false))
                .collect(),
        })
    }

    /// `speed` must be in 1..=255.
    pub fn motor_speed(speed: u32) -> std::result::Result<Self, RangeError> {
        RangeError::check("motor_speed", i64::from(speed), 1, 255)?;
        Ok(Self {
            target: ProbeTarget::MotorSpeed,
            attempts: MOTOR_SPEED_DPS
                .iter()
                .map(|&dp| VendorCommand::new(dp, speed, false))
                .collect(),
        })
    }

    pub fn trigger_calibration() -> Self {
        Self {
            target: ProbeTarget::TriggerCalibration,
            attempts: TRIGGER_CALIBRATION
                .iter()
                .map(|&(dp, v)| VendorCommand::new(dp, v, false))
                .collect(),
        }
    }
}

// ── Passive classifier ───────────────────────────────────────────────────────

/// What an unclaimed data point's value could be. Observational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeHint {
    pub dp: u8,
    pub value: u32,
    pub maybe_motor_speed: bool,
    pub maybe_calibration_time: bool,
    pub maybe_flag: bool,
}

/// Classify a Value-typed report on a candidate id.
///
/// Returns None when the id is outside 5..16, the payload is not a Value
/// of at least 5 bytes, or no pattern matches.
pub fn classify(report: &RawReport) -> Option<ProbeHint> {
    if !PROBE_CANDIDATE_DPS.contains(&report.dp) {
        return None;
    }
    let value = report.value_u32()?;
    let hint = ProbeHint {
        dp: report.dp,
        value,
        maybe_motor_speed: (1..=255).contains(&value),
        maybe_calibration_time: (5..=120).contains(&value),
        maybe_flag: value <= 1,
    };
    (hint.maybe_motor_speed || hint.maybe_calibration_time || hint.maybe_flag).then_some(hint)
}

// ── Active probing ───────────────────────────────────────────────────────────

/// One write attempted during a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub command: VendorCommand,
    /// Milliseconds since the sequence started.
    pub at_ms: u64,
    /// Transport error text, if the write failed.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub target: ProbeTarget,
    pub attempts: Vec<ProbeAttempt>,
    /// Cancelled or torn down before every candidate was tried.
    pub abandoned: bool,
}

/// Clears a target's busy flag when the sequence ends.
struct ActiveGuard(Arc<AtomicBool>);

impl ActiveGuard {
    fn acquire(
        flag: &Arc<AtomicBool>,
        target: ProbeTarget,
    ) -> std::result::Result<Self, ShadeError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag.clone()))
            .map_err(|_| ShadeError::ProbeBusy(target))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running probe sequence.
///
/// Dropping the handle detaches the sequence; it still stops on session
/// teardown.
#[derive(Debug)]
pub struct ProbeHandle {
    target: ProbeTarget,
    cancel: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<std::result::Result<ProbeReport, ShadeError>>>,
}

impl ProbeHandle {
    pub fn target(&self) -> ProbeTarget {
        self.target
    }

    /// Ask the sequence to stop before its next attempt.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Shared cancel flag, e.g. for a signal handler.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the sequence to end.
    pub fn join(mut self) -> Result<ProbeReport> {
        let handle = self
            .join_handle
            .take()
            .ok_or_else(|| eyre::eyre!("probe already joined"))?;
        let res = handle
            .join()
            .map_err(|_| eyre::eyre!("{} probe thread panicked", self.target))?;
        res.map_err(eyre::Report::new)
    }
}

/// Runs probe sequences for one session.
pub struct Prober {
    transport: Arc<dyn Transport + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    cfg: ProberCfg,
    timeout: Duration,
    active: [Arc<AtomicBool>; 3],
    teardown: Arc<AtomicBool>,
}

impl core::fmt::Debug for Prober {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Prober")
            .field("cfg", &self.cfg)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

impl Prober {
    pub fn new(
        transport: Arc<dyn Transport + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        cfg: ProberCfg,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            transport,
            clock,
            cfg,
            timeout: Duration::from_millis(timeouts.transport_ms),
            active: Default::default(),
            teardown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_calibration_time(&self, seconds: u32) -> Result<ProbeHandle> {
        let plan = ProbePlan::calibration_time(seconds).map_err(ShadeError::from)?;
        self.start(plan)
    }

    pub fn set_motor_speed(&self, speed: u32) -> Result<ProbeHandle> {
        let plan = ProbePlan::motor_speed(speed).map_err(ShadeError::from)?;
        self.start(plan)
    }

    pub fn trigger_calibration(&self) -> Result<ProbeHandle> {
        self.start(ProbePlan::trigger_calibration())
    }

    pub fn is_active(&self, target: ProbeTarget) -> bool {
        self.active[target.index()].load(Ordering::Acquire)
    }

    pub fn is_torn_down(&self) -> bool {
        self.teardown.load(Ordering::Relaxed)
    }

    /// Stop every running sequence before its next attempt and refuse new ones.
    pub fn teardown(&self) {
        if !self.teardown.swap(true, Ordering::Relaxed) {
            tracing::debug!("prober torn down");
        }
    }

    /// Start `plan` on a background thread.
    pub fn start(&self, plan: ProbePlan) -> Result<ProbeHandle> {
        if self.is_torn_down() {
            return Err(ShadeError::SessionClosed.into());
        }
        let target = plan.target;
        let guard = ActiveGuard::acquire(&self.active[target.index()], target)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let run = ProbeRun {
            transport: self.transport.clone(),
            clock: self.clock.clone(),
            delay: Duration::from_millis(self.cfg.attempt_delay_ms),
            timeout: self.timeout,
            cancel: cancel.clone(),
            teardown: self.teardown.clone(),
        };
        tracing::info!(%target, attempts = plan.attempts.len(), "probe started");
        let join_handle = std::thread::Builder::new()
            .name(format!("probe-{target}"))
            .spawn(move || {
                let _guard = guard;
                run.execute(plan)
            })
            .wrap_err("spawn probe thread")?;
        Ok(ProbeHandle {
            target,
            cancel,
            join_handle: Some(join_handle),
        })
    }
}

struct ProbeRun {
    transport: Arc<dyn Transport + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    delay: Duration,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
    teardown: Arc<AtomicBool>,
}

impl ProbeRun {
    fn stopped(&self) -> bool {
        self.cancel.load(Ordering::Relaxed) || self.teardown.load(Ordering::Relaxed)
    }

    /// Sleep in slices so cancellation is noticed promptly. Returns false if
    /// the run was stopped.
    fn pause(&self) -> bool {
        let mut left = self.delay;
        while !left.is_zero() {
            if self.stopped() {
                return false;
            }
            let step = left.min(SLEEP_SLICE);
            self.clock.sleep(step);
            left = left.saturating_sub(step);
        }
        !self.stopped()
    }

    fn execute(&self, plan: ProbePlan) -> std::result::Result<ProbeReport, ShadeError> {
        let started: Instant = self.clock.now();
        let target = plan.target;
        let mut report = ProbeReport {
            target,
            attempts: Vec::with_capacity(plan.attempts.len()),
            abandoned: false,
        };

        for (i, cmd) in plan.attempts.into_iter().enumerate() {
            let proceed = if i == 0 { !self.stopped() } else { self.pause() };
            if !proceed {
                tracing::debug!(%target, tried = i, "probe abandoned");
                report.abandoned = true;
                return Ok(report);
            }
            let at_ms = self.clock.ms_since(started);
            let error = match self.transport.send(cmd, self.timeout) {
                Ok(()) => {
                    tracing::debug!(%target, dp = cmd.dp, value = cmd.value, "probe sent");
                    None
                }
                Err(e) => match map_transport_error(e.as_ref()) {
                    ShadeError::Disconnected => {
                        tracing::warn!(%target, dp = cmd.dp, "disconnected, probe aborted");
                        return Err(ShadeError::Disconnected);
                    }
                    other => {
                        tracing::warn!(%target, dp = cmd.dp, error = %other, "probe attempt failed");
                        Some(other.to_string())
                    }
                },
            };
            report.attempts.push(ProbeAttempt {
                command: cmd,
                at_ms,
                error,
            });
        }

        tracing::info!(%target, attempts = report.attempts.len(), "probe finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_hints() {
        let r = |dp, v: u32| {
            let mut p = vec![0x02];
            p.extend_from_slice(&v.to_be_bytes());
            RawReport::new(dp, 0x01, p)
        };
        let h = classify(&r(7, 30)).unwrap();
        assert!(h.maybe_motor_speed && h.maybe_calibration_time && !h.maybe_flag);
        let h = classify(&r(9, 200)).unwrap();
        assert!(h.maybe_motor_speed && !h.maybe_calibration_time);
        let h = classify(&r(6, 0)).unwrap();
        assert!(h.maybe_flag && !h.maybe_motor_speed);
        assert!(classify(&r(6, 1)).is_some_and(|h| h.maybe_flag && h.maybe_motor_speed));
        assert_eq!(classify(&r(6, 300)), None);
        assert_eq!(classify(&r(4, 30)), None);
        assert_eq!(classify(&RawReport::new(7, 0x01, [0x04, 0, 0, 0, 30])), None);
    }

    #[test]
    fn plans_validate_ranges() {
        assert!(ProbePlan::calibration_time(4).is_err());
        assert!(ProbePlan::calibration_time(121).is_err());
        assert!(ProbePlan::motor_speed(0).is_err());
        assert!(ProbePlan::motor_speed(256).is_err());
        let p = ProbePlan::motor_speed(255).unwrap();
        let dps: Vec<u8> = p.attempts.iter().map(|c| c.dp).collect();
        assert_eq!(dps, MOTOR_SPEED_DPS);
        assert!(p.attempts.iter().all(|c| !c.wants_reply && c.value == 255));
    }
}
