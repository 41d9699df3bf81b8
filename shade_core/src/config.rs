//! Runtime configuration for the engine.
//!
//! These are the structs a `DeviceSession` is built from. They are separate
//! from the TOML-deserialized config in `shade_config`; see `conversions`.

/// Position stabilizer timing and acceptance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizerCfg {
    /// Samples are dropped for this long after a motion command.
    pub cooldown_ms: u64,
    /// Samples older than this are pruned from the window.
    pub window_ms: u64,
    /// Samples younger than this count towards settling.
    pub recent_ms: u64,
    /// Minimum number of recent samples before a candidate is computed.
    pub min_recent_samples: usize,
    /// Largest allowed `max - min` over the recent samples.
    pub max_spread: u8,
    /// A candidate must differ from the stable value by at least this much.
    pub hysteresis: u8,
}

impl Default for StabilizerCfg {
    fn default() -> Self {
        Self {
            cooldown_ms: 1000,
            window_ms: 3000,
            recent_ms: 1000,
            min_recent_samples: 2,
            max_spread: 2,
            hysteresis: 2,
        }
    }
}

/// Vendor data points and prediction used by the command translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorCfg {
    /// Enum data point receiving open/stop/close codes.
    pub control_dp: u8,
    /// Value data point receiving absolute lift percentages.
    pub position_dp: u8,
    /// Provisional step applied to the shadow on open/close.
    pub predict_step: u8,
    pub wants_reply: bool,
}

impl Default for TranslatorCfg {
    fn default() -> Self {
        Self {
            control_dp: 1,
            position_dp: 2,
            predict_step: 10,
            wants_reply: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProberCfg {
    /// Pause between consecutive candidate attempts.
    pub attempt_delay_ms: u64,
}

impl Default for ProberCfg {
    fn default() -> Self {
        Self {
            attempt_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Upper bound handed to every transport call.
    pub transport_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { transport_ms: 2000 }
    }
}
