//! Probe sequencing: candidate order, spacing, failure handling, exclusivity
//! and teardown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel as xch;
use rstest::rstest;
use shade_core::mocks::InMemoryShadow;
use shade_core::probe::{CALIBRATION_TIME_DPS, MOTOR_SPEED_DPS};
use shade_core::{DeviceSession, ProbeTarget, ShadeError};
use shade_hardware::SimulatedTransport;
use shade_traits::{BoxError, ManualClock, Transport, VendorCommand};

const WAIT: Duration = Duration::from_secs(5);

fn session_on(
    transport: impl Transport + Send + Sync + 'static,
    clock: &ManualClock,
) -> DeviceSession {
    DeviceSession::builder()
        .with_transport(transport)
        .with_shadow(InMemoryShadow::new())
        .with_clock(clock.clone())
        .build()
        .expect("session builds")
}

fn shade_err(e: &eyre::Report) -> Option<&ShadeError> {
    e.downcast_ref::<ShadeError>()
}

/// Blocks every send until the test releases it.
struct GatedTransport {
    entered: xch::Sender<u8>,
    release: xch::Receiver<()>,
    sent: Mutex<Vec<VendorCommand>>,
}

impl Transport for GatedTransport {
    fn send(&self, cmd: VendorCommand, _timeout: Duration) -> Result<(), BoxError> {
        let _ = self.entered.send(cmd.dp);
        self.release
            .recv_timeout(WAIT)
            .map_err(|_| BoxError::from("gate never opened"))?;
        if let Ok(mut s) = self.sent.lock() {
            s.push(cmd);
        }
        Ok(())
    }
}

fn gated() -> (Arc<GatedTransport>, xch::Receiver<u8>, xch::Sender<()>) {
    let (entered_tx, entered_rx) = xch::unbounded();
    let (release_tx, release_rx) = xch::unbounded();
    let t = Arc::new(GatedTransport {
        entered: entered_tx,
        release: release_rx,
        sent: Mutex::new(Vec::new()),
    });
    (t, entered_rx, release_tx)
}

#[rstest]
fn scenario_d_calibration_time() {
    let clock = ManualClock::new();
    let sim = Arc::new(SimulatedTransport::with_clock(clock.clone()));
    let session = session_on(sim.clone(), &clock);

    let err = session
        .set_calibration_time(3)
        .expect_err("3 s is out of range");
    assert!(matches!(shade_err(&err), Some(ShadeError::OutOfRange(_))));
    assert!(sim.attempts().is_empty());

    let report = session.set_calibration_time(30).unwrap().join().unwrap();
    assert!(!report.abandoned);

    let attempts = sim.attempts();
    let dps: Vec<u8> = attempts.iter().map(|a| a.cmd.dp).collect();
    assert_eq!(dps, CALIBRATION_TIME_DPS);
    assert!(attempts.iter().all(|a| a.cmd.value == 30 && !a.cmd.wants_reply));
    for pair in attempts.windows(2) {
        assert!(pair[1].at_ms - pair[0].at_ms >= 500, "{pair:?}");
    }
    let offsets: Vec<u64> = report.attempts.iter().map(|a| a.at_ms).collect();
    assert_eq!(offsets, vec![0, 500, 1000, 1500]);
}

#[rstest]
#[case(0, false)]
#[case(1, true)]
#[case(255, true)]
#[case(256, false)]
fn motor_speed_range(#[case] speed: u32, #[case] ok: bool) {
    let clock = ManualClock::new();
    let sim = Arc::new(SimulatedTransport::with_clock(clock.clone()));
    let session = session_on(sim.clone(), &clock);
    match session.set_motor_speed(speed) {
        Ok(h) => {
            assert!(ok);
            h.join().unwrap();
            let dps: Vec<u8> = sim.delivered().iter().map(|c| c.dp).collect();
            assert_eq!(dps, MOTOR_SPEED_DPS);
        }
        Err(e) => {
            assert!(!ok);
            assert!(matches!(shade_err(&e), Some(ShadeError::OutOfRange(_))));
            assert!(sim.attempts().is_empty());
        }
    }
}

#[rstest]
fn trigger_calibration_pairs() {
    let clock = ManualClock::new();
    let sim = Arc::new(SimulatedTransport::with_clock(clock.clone()));
    let session = session_on(sim.clone(), &clock);
    session.trigger_calibration().unwrap().join().unwrap();
    assert_eq!(
        sim.delivered(),
        vec![
            VendorCommand::new(16, 1, false),
            VendorCommand::new(17, 1, false),
            VendorCommand::new(18, 1, false),
            VendorCommand::new(101, 1, false),
        ]
    );
}

#[rstest]
fn failed_attempts_are_skipped() {
    let clock = ManualClock::new();
    let sim = Arc::new(SimulatedTransport::with_clock(clock.clone()));
    sim.reject_dp(7);
    sim.reject_dp(9);
    let session = session_on(sim.clone(), &clock);

    let report = session.set_calibration_time(60).unwrap().join().unwrap();
    assert_eq!(report.attempts.len(), 4);
    let failed: Vec<u8> = report
        .attempts
        .iter()
        .filter(|a| a.error.is_some())
        .map(|a| a.command.dp)
        .collect();
    assert_eq!(failed, vec![7, 9]);
    let delivered: Vec<u8> = sim.delivered().iter().map(|c| c.dp).collect();
    assert_eq!(delivered, vec![8, 10]);
}

#[rstest]
fn disconnected_transport_aborts_sequence() {
    let clock = ManualClock::new();
    let sim = Arc::new(SimulatedTransport::with_clock(clock.clone()));
    sim.set_connected(false);
    let mut session = session_on(sim.clone(), &clock);

    let err = session.set_motor_speed(100).unwrap().join().unwrap_err();
    assert!(matches!(shade_err(&err), Some(ShadeError::Disconnected)));
    assert_eq!(sim.attempts().len(), 1);

    // Stabilizer state is untouched by the failed probe.
    assert_eq!(session.stabilizer().cooldown_activations(), 0);
    let out = session.handle_report(&shade_core::RawReport::new(3, 1, [2, 0, 0, 0, 20]));
    assert!(matches!(out, shade_core::ReportOutcome::Position(_)));
}

#[rstest]
fn second_probe_for_same_target_is_busy() {
    let clock = ManualClock::new();
    let (gate, entered, release) = gated();
    let session = session_on(gate.clone(), &clock);

    let first = session.set_calibration_time(30).unwrap();
    assert_eq!(entered.recv_timeout(WAIT).unwrap(), 7);
    assert!(session.prober().is_active(ProbeTarget::CalibrationTime));

    let err = session.set_calibration_time(45).unwrap_err();
    assert!(matches!(
        shade_err(&err),
        Some(ShadeError::ProbeBusy(ProbeTarget::CalibrationTime))
    ));

    // A different target may run alongside.
    let other = session.trigger_calibration().unwrap();

    for _ in 0..8 {
        release.send(()).unwrap();
    }
    assert_eq!(first.join().unwrap().attempts.len(), 4);
    assert_eq!(other.join().unwrap().attempts.len(), 4);
    assert!(!session.prober().is_active(ProbeTarget::CalibrationTime));

    // Free again once finished.
    for _ in 0..4 {
        release.send(()).unwrap();
    }
    session.set_calibration_time(45).unwrap().join().unwrap();
}

#[rstest]
fn teardown_abandons_remaining_attempts() {
    let clock = ManualClock::new();
    let (gate, entered, release) = gated();
    let session = session_on(gate.clone(), &clock);

    let handle = session.set_motor_speed(80).unwrap();
    assert_eq!(entered.recv_timeout(WAIT).unwrap(), 5);
    drop(session);
    release.send(()).unwrap();

    let report = handle.join().expect("teardown is not an error");
    assert!(report.abandoned);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(gate.sent.lock().unwrap().len(), 1);
}

#[rstest]
fn cancel_stops_before_next_attempt() {
    let clock = ManualClock::new();
    let (gate, entered, release) = gated();
    let session = session_on(gate.clone(), &clock);

    let handle = session.trigger_calibration().unwrap();
    assert_eq!(entered.recv_timeout(WAIT).unwrap(), 16);
    handle.cancel();
    release.send(()).unwrap();

    let report = handle.join().unwrap();
    assert!(report.abandoned);
    assert_eq!(report.attempts.len(), 1);
}

#[rstest]
fn probes_refused_after_teardown() {
    let clock = ManualClock::new();
    let session = session_on(SimulatedTransport::with_clock(clock.clone()), &clock);
    session.teardown();
    let err = session.trigger_calibration().unwrap_err();
    assert!(matches!(shade_err(&err), Some(ShadeError::SessionClosed)));
}
