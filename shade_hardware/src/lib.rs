//! Device backends for the blind controller.
//!
//! Only a simulated backend ships here; it records every vendor command it is
//! asked to deliver so sessions, probes and the CLI can be exercised without a
//! radio attached.
pub mod error;

use shade_traits::clock::{Clock, MonotonicClock};
use shade_traits::{BoxError, Transport, VendorCommand};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub use error::TransportError;

/// Environment switch that starts the simulated transport disconnected.
pub const ENV_SIM_DISCONNECTED: &str = "SHADE_TEST_SIM_DISCONNECTED";

/// One delivery attempt seen by the simulated transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentCommand {
    /// Milliseconds since the transport was created.
    pub at_ms: u64,
    pub cmd: VendorCommand,
    pub delivered: bool,
}

/// Simulated vendor transport.
pub struct SimulatedTransport {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    connected: AtomicBool,
    rejected: Mutex<HashSet<u8>>,
    log: Mutex<Vec<SentCommand>>,
}

impl core::fmt::Debug for SimulatedTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedTransport")
            .field("connected", &self.is_connected())
            .field("attempts", &self.log.lock().map(|l| l.len()).unwrap_or(0))
            .finish()
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }

    pub fn with_clock(clock: impl Clock + Send + Sync + 'static) -> Self {
        let epoch = clock.now();
        Self {
            clock: Arc::new(clock),
            epoch,
            connected: AtomicBool::new(true),
            rejected: Mutex::new(HashSet::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Honor `SHADE_TEST_SIM_DISCONNECTED=1` so integration tests can force
    /// the disconnected path through the CLI.
    pub fn from_env(clock: impl Clock + Send + Sync + 'static) -> Self {
        let sim = Self::with_clock(clock);
        if std::env::var(ENV_SIM_DISCONNECTED).is_ok_and(|v| v == "1") {
            tracing::debug!("simulated transport starts disconnected");
            sim.set_connected(false);
        }
        sim
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Make the device reject every write to `dp`.
    pub fn reject_dp(&self, dp: u8) {
        if let Ok(mut set) = self.rejected.lock() {
            set.insert(dp);
        }
    }

    /// Every delivery attempt, in order, including failed ones.
    pub fn attempts(&self) -> Vec<SentCommand> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Commands the device accepted.
    pub fn delivered(&self) -> Vec<VendorCommand> {
        self.attempts()
            .into_iter()
            .filter(|s| s.delivered)
            .map(|s| s.cmd)
            .collect()
    }

    fn record(&self, cmd: VendorCommand, delivered: bool) {
        let at_ms = self.clock.ms_since(self.epoch);
        if let Ok(mut log) = self.log.lock() {
            log.push(SentCommand {
                at_ms,
                cmd,
                delivered,
            });
        }
    }
}

impl Transport for SimulatedTransport {
    fn send(&self, cmd: VendorCommand, timeout: Duration) -> Result<(), BoxError> {
        if timeout.is_zero() {
            self.record(cmd, false);
            return Err(Box::new(TransportError::Timeout(0)));
        }
        if !self.is_connected() {
            self.record(cmd, false);
            return Err(Box::new(TransportError::Disconnected));
        }
        let rejected = self
            .rejected
            .lock()
            .map(|set| set.contains(&cmd.dp))
            .unwrap_or(false);
        if rejected {
            self.record(cmd, false);
            return Err(Box::new(TransportError::Rejected { dp: cmd.dp }));
        }
        tracing::trace!(dp = cmd.dp, value = cmd.value, "simulated send");
        self.record(cmd, true);
        Ok(())
    }
}
