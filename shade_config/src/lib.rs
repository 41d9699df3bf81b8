#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and trace parsing for the blind controller engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The trace CSV loader enforces headers and turns each row into a typed
//!   `TraceEvent` for offline replay.
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DeviceCfg {
    /// Free-form label attached to log lines.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StabilizerCfg {
    /// Samples are dropped for this long after a motion command.
    pub cooldown_ms: u64,
    /// Retention of the sample window.
    pub window_ms: u64,
    /// Age below which a sample counts as "recent" for settling.
    pub recent_ms: u64,
    pub min_recent_samples: usize,
    /// Max allowed (max - min) over recent samples.
    pub max_spread: u8,
    /// Minimum change against the current stable value to publish.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TranslatorCfg {
    pub control_dp: u8,
    pub position_dp: u8,
    /// Provisional step written to the shadow on open/close.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProberCfg {
    /// Delay between consecutive candidate attempts.
    pub attempt_delay_ms: u64,
}

impl Default for ProberCfg {
    fn default() -> Self {
        Self {
            attempt_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Upper bound handed to every transport call.
    pub transport_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { transport_ms: 2000 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub device: DeviceCfg,
    pub stabilizer: StabilizerCfg,
    pub translator: TranslatorCfg,
    pub prober: ProberCfg,
    pub timeouts: Timeouts,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Stabilizer
        let s = &self.stabilizer;
        if s.cooldown_ms == 0 {
            eyre::bail!("stabilizer.cooldown_ms must be >= 1");
        }
        if s.recent_ms == 0 {
            eyre::bail!("stabilizer.recent_ms must be >= 1");
        }
        if s.window_ms < s.recent_ms {
            eyre::bail!("stabilizer.window_ms must be >= stabilizer.recent_ms");
        }
        if s.window_ms > 10 * 60 * 1000 {
            eyre::bail!("stabilizer.window_ms is unreasonably large (>10min)");
        }
        if s.min_recent_samples < 2 {
            eyre::bail!("stabilizer.min_recent_samples must be >= 2");
        }
        if s.max_spread > 100 {
            eyre::bail!("stabilizer.max_spread must be in [0, 100]");
        }
        if !(2..=100).contains(&s.hysteresis) {
            eyre::bail!("stabilizer.hysteresis must be in [2, 100]");
        }

        // Translator
        let t = &self.translator;
        if t.predict_step > 100 {
            eyre::bail!("translator.predict_step must be in [0, 100]");
        }
        if t.control_dp == t.position_dp {
            eyre::bail!("translator.control_dp and translator.position_dp must differ");
        }

        // Prober
        if !(500..=1000).contains(&self.prober.attempt_delay_ms) {
            eyre::bail!("prober.attempt_delay_ms must be in [500, 1000]");
        }

        // Timeouts
        if self.timeouts.transport_ms == 0 {
            eyre::bail!("timeouts.transport_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}

/// One entry of an offline trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A pre-split report: data point id, function tag and payload bytes.
    Report { dp: u8, tag: u8, payload: Vec<u8> },
    /// A full vendor frame as received on the wire.
    Frame { tag: u8, bytes: Vec<u8> },
    Open,
    Close,
    Stop,
    GoTo { percent: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub event: TraceEvent,
}

/// Trace CSV schema.
///
/// Expected headers:
/// t_ms,event,dp,tag,payload
///
/// Example:
/// t_ms,event,dp,tag,payload
/// 0,open,,,
/// 1200,report,3,2,0200000028
/// 1500,frame,,2,000103020004 00000029
#[derive(Debug, Deserialize)]
struct TraceCsvRow {
    t_ms: u64,
    event: String,
    dp: Option<u8>,
    tag: Option<u8>,
    payload: Option<String>,
}

const TRACE_HEADERS: [&str; 5] = ["t_ms", "event", "dp", "tag", "payload"];

pub fn load_trace_csv(path: &Path) -> eyre::Result<Vec<TraceRow>> {
    let file =
        std::fs::File::open(path).map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    parse_trace_csv(file)
}

pub fn parse_trace_csv<R: Read>(reader: R) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read trace CSV headers: {e}"))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != TRACE_HEADERS {
        eyre::bail!(
            "trace CSV must have headers 't_ms,event,dp,tag,payload', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    let mut last_t = 0u64;
    for (idx, rec) in rdr.deserialize::<TraceCsvRow>().enumerate() {
        let line = idx + 2;
        let raw = rec.map_err(|e| eyre::eyre!("invalid trace row {line}: {e}"))?;
        if raw.t_ms < last_t {
            eyre::bail!("trace row {line}: t_ms must be non-decreasing");
        }
        last_t = raw.t_ms;
        let event = parse_event(&raw).map_err(|e| eyre::eyre!("trace row {line}: {e}"))?;
        rows.push(TraceRow {
            t_ms: raw.t_ms,
            event,
        });
    }
    Ok(rows)
}

fn parse_event(raw: &TraceCsvRow) -> eyre::Result<TraceEvent> {
    let payload = raw.payload.as_deref().unwrap_or("");
    match raw.event.to_ascii_lowercase().as_str() {
        "report" => {
            let dp = raw.dp.ok_or_else(|| eyre::eyre!("report requires dp"))?;
            let tag = raw.tag.ok_or_else(|| eyre::eyre!("report requires tag"))?;
            Ok(TraceEvent::Report {
                dp,
                tag,
                payload: decode_hex(payload)?,
            })
        }
        "frame" => {
            let tag = raw.tag.ok_or_else(|| eyre::eyre!("frame requires tag"))?;
            Ok(TraceEvent::Frame {
                tag,
                bytes: decode_hex(payload)?,
            })
        }
        "open" => Ok(TraceEvent::Open),
        "close" => Ok(TraceEvent::Close),
        "stop" => Ok(TraceEvent::Stop),
        "goto" => {
            let percent = payload
                .parse::<u8>()
                .map_err(|e| eyre::eyre!("goto payload must be a percentage: {e}"))?;
            Ok(TraceEvent::GoTo { percent })
        }
        other => eyre::bail!("unknown event '{other}'"),
    }
}

fn decode_hex(s: &str) -> eyre::Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|e| eyre::eyre!("payload is not valid hex: {e}"))
}
