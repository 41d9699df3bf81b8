//! `From` implementations bridging `shade_config` types to `shade_core` types.

use crate::config::{ProberCfg, StabilizerCfg, Timeouts, TranslatorCfg};

// ── StabilizerCfg ────────────────────────────────────────────────────────────

impl From<&shade_config::StabilizerCfg> for StabilizerCfg {
    fn from(c: &shade_config::StabilizerCfg) -> Self {
        Self {
            cooldown_ms: c.cooldown_ms,
            window_ms: c.window_ms,
            recent_ms: c.recent_ms,
            min_recent_samples: c.min_recent_samples,
            max_spread: c.max_spread,
            hysteresis: c.hysteresis,
        }
    }
}

// ── TranslatorCfg ────────────────────────────────────────────────────────────

impl From<&shade_config::TranslatorCfg> for TranslatorCfg {
    fn from(c: &shade_config::TranslatorCfg) -> Self {
        Self {
            control_dp: c.control_dp,
            position_dp: c.position_dp,
            predict_step: c.predict_step,
            wants_reply: c.wants_reply,
        }
    }
}

// ── ProberCfg ────────────────────────────────────────────────────────────────

impl From<&shade_config::ProberCfg> for ProberCfg {
    fn from(c: &shade_config::ProberCfg) -> Self {
        Self {
            attempt_delay_ms: c.attempt_delay_ms,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&shade_config::Timeouts> for Timeouts {
    fn from(c: &shade_config::Timeouts) -> Self {
        Self {
            transport_ms: c.transport_ms,
        }
    }
}
