pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::sync::Arc;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One outbound vendor data-point write: `(dp, value, wants_reply)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VendorCommand {
    pub dp: u8,
    pub value: u32,
    pub wants_reply: bool,
}

impl VendorCommand {
    pub const fn new(dp: u8, value: u32, wants_reply: bool) -> Self {
        Self {
            dp,
            value,
            wants_reply,
        }
    }
}

/// Outbound path to the device. Calls must be bounded by `timeout`.
///
/// Takes `&self` so one transport can be shared between the session and
/// background probe threads.
pub trait Transport {
    fn send(&self, cmd: VendorCommand, timeout: Duration) -> Result<(), BoxError>;
}

/// The standardized attribute store owned by the host framework.
pub trait AttributeShadow {
    /// Current lift position in percent (0 = open, 100 = closed), if known.
    fn lift_percentage(&self) -> Option<u8>;
    fn write_lift_percentage(&self, percent: u8) -> Result<(), BoxError>;
    /// Battery remaining in half-percent units (0..=200).
    fn write_battery_half_percent(&self, half_percent: u8) -> Result<(), BoxError>;
    fn write_battery_low(&self, low: bool) -> Result<(), BoxError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, cmd: VendorCommand, timeout: Duration) -> Result<(), BoxError> {
        (**self).send(cmd, timeout)
    }
}

impl<T: AttributeShadow + ?Sized> AttributeShadow for Arc<T> {
    fn lift_percentage(&self) -> Option<u8> {
        (**self).lift_percentage()
    }
    fn write_lift_percentage(&self, percent: u8) -> Result<(), BoxError> {
        (**self).write_lift_percentage(percent)
    }
    fn write_battery_half_percent(&self, half_percent: u8) -> Result<(), BoxError> {
        (**self).write_battery_half_percent(half_percent)
    }
    fn write_battery_low(&self, low: bool) -> Result<(), BoxError> {
        (**self).write_battery_low(low)
    }
}
