//! Type-state builder for `DeviceSession`.
//!
//! The builder enforces at compile time that a transport and an attribute
//! shadow are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use shade_traits::clock::{Clock, MonotonicClock};
use shade_traits::{AttributeShadow, Transport};

use crate::config::{ProberCfg, StabilizerCfg, Timeouts, TranslatorCfg};
use crate::decoder::Decoder;
use crate::error::{BuildError, Result};
use crate::probe::Prober;
use crate::session::DeviceSession;
use crate::stabilizer::PositionStabilizer;
use crate::translator::CommandTranslator;

impl DeviceSession {
    /// Start building a session.
    pub fn builder() -> SessionBuilder<Missing, Missing> {
        SessionBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `DeviceSession`. All fields are validated on `build()`.
pub struct SessionBuilder<T, A> {
    transport: Option<Arc<dyn Transport + Send + Sync>>,
    shadow: Option<Arc<dyn AttributeShadow + Send + Sync>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    name: Option<String>,
    stabilizer: Option<StabilizerCfg>,
    translator: Option<TranslatorCfg>,
    prober: Option<ProberCfg>,
    timeouts: Option<Timeouts>,
    _t: PhantomData<T>,
    _a: PhantomData<A>,
}

impl Default for SessionBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            transport: None,
            shadow: None,
            clock: None,
            name: None,
            stabilizer: None,
            translator: None,
            prober: None,
            timeouts: None,
            _t: PhantomData,
            _a: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate runtime configuration and assemble the session.
#[allow(clippy::too_many_arguments)]
fn validate_and_build(
    transport: Arc<dyn Transport + Send + Sync>,
    shadow: Arc<dyn AttributeShadow + Send + Sync>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    name: Option<String>,
    stabilizer: StabilizerCfg,
    translator: TranslatorCfg,
    prober: ProberCfg,
    timeouts: Timeouts,
) -> Result<DeviceSession> {
    // ── Validation ───────────────────────────────────────────────────────────
    if stabilizer.cooldown_ms == 0 {
        return Err(invalid("cooldown_ms must be >= 1"));
    }
    if stabilizer.recent_ms == 0 {
        return Err(invalid("recent_ms must be >= 1"));
    }
    if stabilizer.window_ms < stabilizer.recent_ms {
        return Err(invalid("window_ms must be >= recent_ms"));
    }
    if stabilizer.min_recent_samples < 2 {
        return Err(invalid("min_recent_samples must be >= 2"));
    }
    if stabilizer.hysteresis < 2 {
        return Err(invalid("hysteresis must be >= 2"));
    }
    if stabilizer.max_spread > 100 || stabilizer.hysteresis > 100 {
        return Err(invalid("max_spread and hysteresis must be <= 100"));
    }
    if translator.predict_step > 100 {
        return Err(invalid("predict_step must be <= 100"));
    }
    if translator.control_dp == translator.position_dp {
        return Err(invalid("control_dp and position_dp must differ"));
    }
    if !(500..=1000).contains(&prober.attempt_delay_ms) {
        return Err(invalid("attempt_delay_ms must be in 500..=1000"));
    }
    if timeouts.transport_ms == 0 {
        return Err(invalid("transport_ms must be >= 1"));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    tracing::debug!(name = ?name, ?stabilizer, ?translator, "session built");
    Ok(DeviceSession {
        name,
        prober: Prober::new(transport.clone(), clock.clone(), prober, timeouts),
        transport,
        shadow,
        clock,
        epoch,
        decoder: Decoder::new(),
        stabilizer: PositionStabilizer::new(stabilizer),
        translator: CommandTranslator::new(translator),
        hints: BTreeMap::new(),
        timeouts,
    })
}

impl<T, A> SessionBuilder<T, A> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<DeviceSession> {
        let transport = self
            .transport
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTransport))?;
        let shadow = self
            .shadow
            .ok_or_else(|| eyre::Report::new(BuildError::MissingShadow))?;
        validate_and_build(
            transport,
            shadow,
            self.clock,
            self.name,
            self.stabilizer.unwrap_or_default(),
            self.translator.unwrap_or_default(),
            self.prober.unwrap_or_default(),
            self.timeouts.unwrap_or_default(),
        )
    }

    /// Chainable setters that do not affect type-state.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn with_stabilizer(mut self, cfg: StabilizerCfg) -> Self {
        self.stabilizer = Some(cfg);
        self
    }
    pub fn with_translator(mut self, cfg: TranslatorCfg) -> Self {
        self.translator = Some(cfg);
        self
    }
    pub fn with_prober(mut self, cfg: ProberCfg) -> Self {
        self.prober = Some(cfg);
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Apply every engine section of a loaded config file.
    pub fn with_config(self, cfg: &shade_config::Config) -> Self {
        let name = cfg.device.name.clone();
        let b = self
            .with_stabilizer((&cfg.stabilizer).into())
            .with_translator((&cfg.translator).into())
            .with_prober((&cfg.prober).into())
            .with_timeouts((&cfg.timeouts).into());
        match name {
            Some(n) => b.with_name(n),
            None => b,
        }
    }
}

// Setters that advance type-state
impl<A> SessionBuilder<Missing, A> {
    pub fn with_transport(
        self,
        transport: impl Transport + Send + Sync + 'static,
    ) -> SessionBuilder<Set, A> {
        SessionBuilder {
            transport: Some(Arc::new(transport)),
            shadow: self.shadow,
            clock: self.clock,
            name: self.name,
            stabilizer: self.stabilizer,
            translator: self.translator,
            prober: self.prober,
            timeouts: self.timeouts,
            _t: PhantomData,
            _a: PhantomData,
        }
    }
}

impl<T> SessionBuilder<T, Missing> {
    pub fn with_shadow(
        self,
        shadow: impl AttributeShadow + Send + Sync + 'static,
    ) -> SessionBuilder<T, Set> {
        SessionBuilder {
            transport: self.transport,
            shadow: Some(Arc::new(shadow)),
            clock: self.clock,
            name: self.name,
            stabilizer: self.stabilizer,
            translator: self.translator,
            prober: self.prober,
            timeouts: self.timeouts,
            _t: PhantomData,
            _a: PhantomData,
        }
    }
}

impl SessionBuilder<Set, Set> {
    /// Validate and build the session. Only available once transport and shadow are set.
    pub fn build(self) -> Result<DeviceSession> {
        self.try_build()
    }
}
