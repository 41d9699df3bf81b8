//! Human-readable error descriptions and structured JSON error formatting.

use shade_core::error::{BuildError, ShadeError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingTransport => {
                "What happened: No transport was provided to the device session.\nLikely causes: The device backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure a transport is created and passed via with_transport(...).".to_string()
            }
            BuildError::MissingShadow => {
                "What happened: No attribute store was provided to the device session.\nLikely causes: The host attribute shadow was not wired into the builder.\nHow to fix: Pass one via with_shadow(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<ShadeError>() {
        return match se {
            ShadeError::OutOfRange(r) => format!(
                "What happened: {} = {} is not accepted.\nLikely causes: The value is outside {}..={}.\nHow to fix: Pick a value inside that range and rerun.",
                r.field, r.value, r.min, r.max
            ),
            ShadeError::Disconnected => {
                "What happened: The device is not reachable.\nLikely causes: The blind is out of range, asleep, or its battery is empty.\nHow to fix: Wake the device or move it closer, then retry. Probing stops at the first disconnect.".to_string()
            }
            ShadeError::Timeout => {
                "What happened: The device did not answer in time.\nLikely causes: A weak link or timeouts.transport_ms set too low.\nHow to fix: Retry, or raise timeouts.transport_ms in the config.".to_string()
            }
            ShadeError::ProbeBusy(target) => format!(
                "What happened: A {target} probe is already running.\nLikely causes: An earlier probe for the same setting has not finished.\nHow to fix: Wait for it to finish or cancel it, then retry."
            ),
            ShadeError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            // Fallback to generic for other domain errors
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from file handling
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 't_ms,event,dp,tag,payload'.".to_string();
    }

    if lower.contains("read config") || lower.contains("open trace") {
        return format!(
            "What happened: {msg}.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the file path and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 rejected input, 3 disconnected, 4 other transport failure, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return 2;
    }
    match err.downcast_ref::<ShadeError>() {
        Some(ShadeError::OutOfRange(_) | ShadeError::Config(_)) => 2,
        Some(ShadeError::Disconnected) => 3,
        Some(ShadeError::Transport(_) | ShadeError::Timeout) => 4,
        _ => 1,
    }
}

/// Stable reason name for JSON output.
fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<ShadeError>() {
        Some(ShadeError::OutOfRange(_)) => "OutOfRange",
        Some(ShadeError::Config(_)) => "InvalidConfig",
        Some(ShadeError::Disconnected) => "Disconnected",
        Some(ShadeError::Timeout) => "Timeout",
        Some(ShadeError::Transport(_)) => "Transport",
        Some(ShadeError::ProbeBusy(_)) => "ProbeBusy",
        Some(ShadeError::SessionClosed) => "SessionClosed",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(ShadeError::OutOfRange(r)) = err.downcast_ref::<ShadeError>() {
        return json!({
            "reason": "OutOfRange",
            "details": { "field": r.field, "value": r.value, "min": r.min, "max": r.max },
            "message": humanize(err),
        })
        .to_string();
    }

    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
