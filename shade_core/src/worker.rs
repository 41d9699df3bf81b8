//! Per-session worker thread.
//!
//! Moves a `DeviceSession` onto a dedicated thread and serializes every
//! report, command and query through one bounded channel, so cooldown and
//! window transitions never race. Probe requests only start the probe thread
//! and return; they never block report handling.
//!
//! Safety: each `SessionWorker` spawns exactly one thread that is shut down
//! and joined when the handle is dropped. Dropping the session on that thread
//! tears down any running probes.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;

use crate::decoder::DiscoveredDataPoint;
use crate::error::{Result, ShadeError};
use crate::probe::ProbeHandle;
use crate::report::RawReport;
use crate::session::DeviceSession;
use crate::translator::{CoverCommand, Translation};

/// Queue depth between callers and the worker thread.
pub const QUEUE_CAPACITY: usize = 64;

/// How often an idle worker re-checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

enum ProbeRequest {
    CalibrationTime(u32),
    MotorSpeed(u32),
    TriggerCalibration,
}

enum Request {
    Report(RawReport),
    Frame { tag: u8, bytes: Vec<u8> },
    Command(CoverCommand, xch::Sender<Result<Translation>>),
    Discovered(xch::Sender<BTreeMap<u8, DiscoveredDataPoint>>),
    StablePosition(xch::Sender<Option<u8>>),
    Probe(ProbeRequest, xch::Sender<Result<ProbeHandle>>),
}

pub struct SessionWorker {
    tx: Option<xch::Sender<Request>>,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl SessionWorker {
    pub fn spawn(session: DeviceSession) -> Result<Self> {
        let (tx, rx) = xch::bounded::<Request>(QUEUE_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let name = session.name().unwrap_or("device").to_string();

        let join_handle = std::thread::Builder::new()
            .name(format!("session-{name}"))
            .spawn(move || {
                let mut session = session;
                loop {
                    if shutdown_clone.load(Ordering::Relaxed) {
                        tracing::debug!("session worker received shutdown signal");
                        break;
                    }
                    match rx.recv_timeout(SHUTDOWN_POLL) {
                        Ok(req) => serve(&mut session, req),
                        Err(xch::RecvTimeoutError::Timeout) => {}
                        Err(xch::RecvTimeoutError::Disconnected) => {
                            tracing::debug!("session worker callers gone, exiting thread");
                            break;
                        }
                    }
                }
                drop(session);
                tracing::trace!("session worker exiting cleanly");
            })?;

        Ok(Self {
            tx: Some(tx),
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    fn submit(&self, req: Request) -> Result<()> {
        self.tx
            .as_ref()
            .ok_or(ShadeError::SessionClosed)?
            .send(req)
            .map_err(|_| ShadeError::SessionClosed)?;
        Ok(())
    }

    fn ask<R>(&self, make: impl FnOnce(xch::Sender<R>) -> Request) -> Result<R> {
        let (reply_tx, reply_rx) = xch::bounded(1);
        self.submit(make(reply_tx))?;
        reply_rx
            .recv()
            .map_err(|_| ShadeError::SessionClosed.into())
    }

    /// Queue an inbound report. Returns once queued, not once handled.
    pub fn report(&self, report: RawReport) -> Result<()> {
        self.submit(Request::Report(report))
    }

    /// Queue a raw vendor frame.
    pub fn frame(&self, tag: u8, bytes: Vec<u8>) -> Result<()> {
        self.submit(Request::Frame { tag, bytes })
    }

    /// Issue a cover command and wait for the send result.
    pub fn command(&self, cmd: CoverCommand) -> Result<Translation> {
        self.ask(|tx| Request::Command(cmd, tx))?
    }

    pub fn discovered_data_points(&self) -> Result<BTreeMap<u8, DiscoveredDataPoint>> {
        self.ask(Request::Discovered)
    }

    pub fn stable_position(&self) -> Result<Option<u8>> {
        self.ask(Request::StablePosition)
    }

    pub fn set_calibration_time(&self, seconds: u32) -> Result<ProbeHandle> {
        self.ask(|tx| Request::Probe(ProbeRequest::CalibrationTime(seconds), tx))?
    }

    pub fn set_motor_speed(&self, speed: u32) -> Result<ProbeHandle> {
        self.ask(|tx| Request::Probe(ProbeRequest::MotorSpeed(speed), tx))?
    }

    pub fn trigger_calibration(&self) -> Result<ProbeHandle> {
        self.ask(|tx| Request::Probe(ProbeRequest::TriggerCalibration, tx))?
    }
}

fn serve(session: &mut DeviceSession, req: Request) {
    // A failed reply send means the caller stopped waiting; nothing to do.
    match req {
        Request::Report(r) => {
            session.handle_report(&r);
        }
        Request::Frame { tag, bytes } => {
            session.handle_frame(tag, &bytes);
        }
        Request::Command(cmd, reply) => {
            let _ = reply.send(session.handle_command(cmd));
        }
        Request::Discovered(reply) => {
            let _ = reply.send(session.discovered_data_points());
        }
        Request::StablePosition(reply) => {
            let _ = reply.send(session.stable_position());
        }
        Request::Probe(p, reply) => {
            let res = match p {
                ProbeRequest::CalibrationTime(s) => session.set_calibration_time(s),
                ProbeRequest::MotorSpeed(v) => session.set_motor_speed(v),
                ProbeRequest::TriggerCalibration => session.trigger_calibration(),
            };
            let _ = reply.send(res);
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.tx.take();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("session worker joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "session worker panicked during shutdown");
                }
            }
        }
    }
}
