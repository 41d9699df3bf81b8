//! Per-device session: owns decoder, stabilizer, translator and prober state
//! and wires them to the transport and attribute shadow.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shade_traits::clock::Clock;
use shade_traits::{AttributeShadow, Transport};

use crate::config::Timeouts;
use crate::decoder::{DecodedEvent, Decoder, DiscoveredDataPoint};
use crate::error::{Result, ShadeError};
use crate::frame::decode_frame;
use crate::hw_error::map_transport_error;
use crate::probe::{ProbeHandle, ProbeHint, Prober, classify};
use crate::report::RawReport;
use crate::stabilizer::PositionStabilizer;
use crate::status::{ReportOutcome, SampleOutcome, StabilizerState};
use crate::translator::{CommandTranslator, CoverCommand, Translation};

/// All state for one bound device. Not shared between devices.
///
/// Reports and commands take `&mut self`, so one session serializes its own
/// events; see `worker::SessionWorker` for a threaded front-end. Dropping the
/// session tears down any running probes.
pub struct DeviceSession {
    pub(crate) name: Option<String>,
    pub(crate) transport: Arc<dyn Transport + Send + Sync>,
    pub(crate) shadow: Arc<dyn AttributeShadow + Send + Sync>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) decoder: Decoder,
    pub(crate) stabilizer: PositionStabilizer,
    pub(crate) translator: CommandTranslator,
    pub(crate) prober: Prober,
    pub(crate) hints: BTreeMap<u8, ProbeHint>,
    pub(crate) timeouts: Timeouts,
}

impl core::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("name", &self.name)
            .field("stable_position", &self.stabilizer.stable_position())
            .field("discovered", &self.decoder.discovered().len())
            .field("hints", &self.hints.len())
            .finish()
    }
}

impl DeviceSession {
    /// Milliseconds since the session was built.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Handle one inbound report.
    pub fn handle_report(&mut self, report: &RawReport) -> ReportOutcome {
        let now = self.now_ms();
        match self.decoder.decode(report, now) {
            DecodedEvent::PassThrough => ReportOutcome::PassThrough,
            DecodedEvent::NoOp => ReportOutcome::NoOp,
            DecodedEvent::Position(sample) => {
                let outcome = self.stabilizer.on_sample(sample);
                if let SampleOutcome::Settled(p) = outcome
                    && let Err(e) = self.shadow.write_lift_percentage(p)
                {
                    tracing::warn!(position = p, error = %e, "shadow lift write failed");
                }
                ReportOutcome::Position(outcome)
            }
            DecodedEvent::Battery(b) => {
                let half_percent = b.to_half_percent();
                if let Err(e) = self.shadow.write_battery_half_percent(half_percent) {
                    tracing::warn!(half_percent, error = %e, "shadow battery write failed");
                }
                ReportOutcome::Battery { half_percent }
            }
            DecodedEvent::BatteryStatus { low } => {
                if let Err(e) = self.shadow.write_battery_low(low) {
                    tracing::warn!(low, error = %e, "shadow battery-low write failed");
                }
                ReportOutcome::BatteryStatus { low }
            }
            DecodedEvent::Unknown { dp, probe_candidate } => {
                let hint = if probe_candidate { classify(report) } else { None };
                if let Some(h) = hint {
                    tracing::info!(
                        dp,
                        value = h.value,
                        motor_speed = h.maybe_motor_speed,
                        calibration_time = h.maybe_calibration_time,
                        flag = h.maybe_flag,
                        "data point looks like configuration"
                    );
                    self.hints.insert(dp, h);
                }
                ReportOutcome::Unknown { dp, hint }
            }
        }
    }

    /// Split a raw vendor frame and handle the report inside it.
    /// Malformed frames are discarded like malformed payloads.
    pub fn handle_frame(&mut self, tag: u8, bytes: &[u8]) -> ReportOutcome {
        match decode_frame(tag, bytes) {
            Ok(report) => self.handle_report(&report),
            Err(e) => {
                tracing::trace!(tag, error = %e, "malformed frame, discarded");
                ReportOutcome::NoOp
            }
        }
    }

    /// Translate and send one cover command.
    ///
    /// The cooldown starts before the command is sent and the provisional
    /// position is written best-effort. A send failure is returned; the
    /// stabilizer stays in cooldown either way.
    pub fn handle_command(&mut self, cmd: CoverCommand) -> Result<Translation> {
        let current = self.shadow.lift_percentage();
        let translation = self
            .translator
            .translate(cmd, current)
            .map_err(ShadeError::from)?;

        self.stabilizer.begin_cooldown(self.now_ms());

        match (translation.prediction, cmd) {
            (Some(p), _) => {
                if let Err(e) = self.shadow.write_lift_percentage(p) {
                    tracing::warn!(%cmd, predicted = p, error = %e, "prediction write failed");
                }
            }
            (None, CoverCommand::Open | CoverCommand::Close) => {
                tracing::debug!(%cmd, "no current lift value, prediction skipped");
            }
            (None, _) => {}
        }

        let timeout = Duration::from_millis(self.timeouts.transport_ms);
        self.transport
            .send(translation.command, timeout)
            .map_err(|e| map_transport_error(e.as_ref()))?;
        tracing::debug!(
            %cmd,
            dp = translation.command.dp,
            value = translation.command.value,
            "command sent"
        );
        Ok(translation)
    }

    /// Snapshot of every data point seen, keyed by id.
    pub fn discovered_data_points(&self) -> BTreeMap<u8, DiscoveredDataPoint> {
        self.decoder.discovered().clone()
    }

    /// Classifier hints, latest per data point.
    pub fn hints(&self) -> &BTreeMap<u8, ProbeHint> {
        &self.hints
    }

    pub fn stable_position(&self) -> Option<u8> {
        self.stabilizer.stable_position()
    }

    pub fn stabilizer_state(&self) -> StabilizerState {
        self.stabilizer.state(self.now_ms())
    }

    pub fn stabilizer(&self) -> &PositionStabilizer {
        &self.stabilizer
    }

    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    pub fn set_calibration_time(&self, seconds: u32) -> Result<ProbeHandle> {
        self.prober.set_calibration_time(seconds)
    }

    pub fn set_motor_speed(&self, speed: u32) -> Result<ProbeHandle> {
        self.prober.set_motor_speed(speed)
    }

    pub fn trigger_calibration(&self) -> Result<ProbeHandle> {
        self.prober.trigger_calibration()
    }

    /// Abandon running probes. Also happens on drop.
    pub fn teardown(&self) {
        self.prober.teardown();
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.prober.teardown();
        tracing::trace!(name = ?self.name, "session dropped");
    }
}
