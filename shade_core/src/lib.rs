#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Data-point interpretation and position-stabilization engine for
//! motorized blinds (hardware-agnostic).
//!
//! All device interaction goes through `shade_traits::Transport` and the
//! host's attribute store through `shade_traits::AttributeShadow`.
//!
//! ## Architecture
//!
//! - **Frames**: vendor cluster frame codec (`frame`)
//! - **Decoding**: raw reports to typed events, discovered data points (`decoder`)
//! - **Stabilization**: cooldown, sample window and hysteresis (`stabilizer`)
//! - **Commands**: open/close/stop/go-to remap and prediction (`translator`)
//! - **Probing**: candidate configuration writes and passive hints (`probe`)
//! - **Sessions**: per-device state, builder and worker thread (`session`, `builder`, `worker`)
//! - **Replay**: offline trace runner (`runner`)
//!
//! Time is injected through `shade_traits::clock::Clock` and measured in
//! milliseconds since the session epoch.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod hw_error;
pub mod mocks;
pub mod probe;
pub mod report;
pub mod runner;
pub mod session;
pub mod stabilizer;
pub mod status;
pub mod translator;
pub mod util;
pub mod worker;

pub use builder::{Missing, SessionBuilder, Set};
pub use config::{ProberCfg, StabilizerCfg, Timeouts, TranslatorCfg};
pub use decoder::{BatteryReport, DecodedEvent, Decoder, DiscoveredDataPoint, PositionSample};
pub use error::{BuildError, RangeError, Result, ShadeError};
pub use frame::{FrameError, decode_frame, encode_command};
pub use probe::{ProbeHandle, ProbeHint, ProbePlan, ProbeReport, ProbeTarget, Prober};
pub use report::{DataPointType, FunctionTag, RawReport};
pub use runner::{ReplaySummary, replay};
pub use session::DeviceSession;
pub use stabilizer::PositionStabilizer;
pub use status::{ReportOutcome, SampleOutcome, StabilizerState};
pub use translator::{CommandTranslator, CoverCommand, Translation};
pub use worker::SessionWorker;
