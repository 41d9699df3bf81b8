//! Test and helper mocks for shade_core

use shade_traits::{AttributeShadow, BoxError, Transport, VendorCommand};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A transport that accepts every command and forgets it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _cmd: VendorCommand, _timeout: std::time::Duration) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ShadowState {
    lift: Option<u8>,
    battery_half_percent: Option<u8>,
    battery_low: Option<bool>,
    lift_writes: Vec<u8>,
    battery_writes: Vec<u8>,
}

/// Attribute shadow kept in memory, recording every write.
#[derive(Debug, Default)]
pub struct InMemoryShadow {
    state: Mutex<ShadowState>,
    fail_writes: AtomicBool,
}

impl InMemoryShadow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a known lift position.
    pub fn with_lift(percent: u8) -> Self {
        let s = Self::default();
        if let Ok(mut st) = s.state.lock() {
            st.lift = Some(percent);
        }
        s
    }

    /// Make every write fail, leaving state untouched.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn lift_writes(&self) -> Vec<u8> {
        self.read(|s| s.lift_writes.clone())
    }

    pub fn battery_writes(&self) -> Vec<u8> {
        self.read(|s| s.battery_writes.clone())
    }

    pub fn battery_half_percent(&self) -> Option<u8> {
        self.read(|s| s.battery_half_percent)
    }

    pub fn battery_low(&self) -> Option<bool> {
        self.read(|s| s.battery_low)
    }

    fn read<R: Default>(&self, f: impl FnOnce(&ShadowState) -> R) -> R {
        self.state.lock().map(|s| f(&s)).unwrap_or_default()
    }

    fn write(&self, f: impl FnOnce(&mut ShadowState)) -> Result<(), BoxError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err("shadow write refused".into());
        }
        let mut st = self
            .state
            .lock()
            .map_err(|_| BoxError::from("shadow lock poisoned"))?;
        f(&mut st);
        Ok(())
    }
}

impl AttributeShadow for InMemoryShadow {
    fn lift_percentage(&self) -> Option<u8> {
        self.read(|s| s.lift)
    }

    fn write_lift_percentage(&self, percent: u8) -> Result<(), BoxError> {
        self.write(|s| {
            s.lift = Some(percent);
            s.lift_writes.push(percent);
        })
    }

    fn write_battery_half_percent(&self, half_percent: u8) -> Result<(), BoxError> {
        self.write(|s| {
            s.battery_half_percent = Some(half_percent);
            s.battery_writes.push(half_percent);
        })
    }

    fn write_battery_low(&self, low: bool) -> Result<(), BoxError> {
        self.write(|s| s.battery_low = Some(low))
    }
}
