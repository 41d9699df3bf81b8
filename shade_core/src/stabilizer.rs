//! Position stabilizer.
//!
//! Drops telemetry during the post-command cooldown, keeps a time-bounded
//! window of samples and accepts a new stable position once the recent part
//! of the window agrees. Pure state machine: publishing the accepted value
//! is up to the caller.
use std::collections::VecDeque;

use crate::config::StabilizerCfg;
use crate::decoder::PositionSample;
use crate::status::{SampleOutcome, StabilizerState};
use crate::util::mean_round_u8;

#[derive(Debug, Clone)]
pub struct PositionStabilizer {
    cfg: StabilizerCfg,
    window: VecDeque<PositionSample>,
    cooldown_until_ms: Option<u64>,
    stable: Option<u8>,
    just_settled: bool,
    cooldown_activations: u64,
}

impl PositionStabilizer {
    pub fn new(cfg: StabilizerCfg) -> Self {
        Self {
            cfg,
            window: VecDeque::new(),
            cooldown_until_ms: None,
            stable: None,
            just_settled: false,
            cooldown_activations: 0,
        }
    }

    pub fn cfg(&self) -> &StabilizerCfg {
        &self.cfg
    }

    /// A motion command went out at `now_ms`.
    pub fn begin_cooldown(&mut self, now_ms: u64) {
        let until = now_ms.saturating_add(self.cfg.cooldown_ms);
        self.cooldown_until_ms = Some(until);
        self.window.clear();
        self.just_settled = false;
        self.cooldown_activations += 1;
        tracing::debug!(now_ms, until_ms = until, "cooldown started");
    }

    pub fn in_cooldown(&self, now_ms: u64) -> bool {
        self.cooldown_until_ms.is_some_and(|until| now_ms < until)
    }

    /// Feed one sample. Its timestamp is taken as the current time.
    pub fn on_sample(&mut self, sample: PositionSample) -> SampleOutcome {
        let now = sample.t_ms;
        self.just_settled = false;
        if self.in_cooldown(now) {
            tracing::trace!(t_ms = now, value = sample.value, "sample dropped in cooldown");
            return SampleOutcome::DroppedCooldown;
        }

        self.window.push_back(sample);
        self.prune(now);

        let recent_ms = self.cfg.recent_ms;
        let recent = || {
            self.window
                .iter()
                .filter(move |s| now.saturating_sub(s.t_ms) < recent_ms)
                .map(|s| s.value)
        };
        let count = recent().count();
        if count < self.cfg.min_recent_samples {
            return SampleOutcome::Collecting;
        }
        let (lo, hi) = recent().fold((u8::MAX, u8::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if hi.saturating_sub(lo) > self.cfg.max_spread {
            tracing::trace!(t_ms = now, lo, hi, "recent samples still moving");
            return SampleOutcome::Collecting;
        }
        let Some(candidate) = mean_round_u8(recent()) else {
            return SampleOutcome::Collecting;
        };

        match self.stable {
            Some(stable) if candidate.abs_diff(stable) < self.cfg.hysteresis => {
                SampleOutcome::Held(candidate)
            }
            previous => {
                self.stable = Some(candidate);
                self.window.clear();
                self.just_settled = true;
                tracing::info!(t_ms = now, position = candidate, ?previous, "position settled");
                SampleOutcome::Settled(candidate)
            }
        }
    }

    fn prune(&mut self, now_ms: u64) {
        let before = self.window.len();
        let window_ms = self.cfg.window_ms;
        self.window.retain(|s| now_ms.saturating_sub(s.t_ms) < window_ms);
        let pruned = before - self.window.len();
        if pruned > 0 {
            tracing::debug!(pruned, kept = self.window.len(), "window pruned");
        }
    }

    pub fn state(&self, now_ms: u64) -> StabilizerState {
        if self.in_cooldown(now_ms) {
            StabilizerState::Cooling
        } else if self.just_settled {
            StabilizerState::Settled
        } else if self
            .window
            .iter()
            .any(|s| now_ms.saturating_sub(s.t_ms) < self.cfg.window_ms)
        {
            StabilizerState::Collecting
        } else {
            StabilizerState::Idle
        }
    }

    pub fn stable_position(&self) -> Option<u8> {
        self.stable
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Number of cooldowns started since creation.
    pub fn cooldown_activations(&self) -> u64 {
        self.cooldown_activations
    }
}
