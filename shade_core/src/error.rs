use thiserror::Error;

use crate::probe::ProbeTarget;

/// A user-supplied value outside its valid domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field} = {value} is outside {min}..={max}")]
pub struct RangeError {
    pub field: &'static str,
    pub value: i64,
    pub min: i64,
    pub max: i64,
}

impl RangeError {
    /// Check `value` against `min..=max`.
    pub fn check(
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    ) -> std::result::Result<(), Self> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self {
                field,
                value,
                min,
                max,
            })
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum ShadeError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("transport disconnected")]
    Disconnected,
    #[error("transport timeout")]
    Timeout,
    #[error("value out of range: {0}")]
    OutOfRange(#[from] RangeError),
    #[error("a {0} probe is already running")]
    ProbeBusy(ProbeTarget),
    #[error("session closed")]
    SessionClosed,
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing transport")]
    MissingTransport,
    #[error("missing attribute shadow")]
    MissingShadow,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
