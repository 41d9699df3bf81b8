//! Maps `Box<dyn Error>` from trait boundaries to typed `ShadeError`.
//!
//! The traits in `shade_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `shade_hardware::TransportError` downcasting.

use crate::error::ShadeError;

/// Map a trait-boundary error to a typed `ShadeError`.
///
/// Attempts to downcast known transport error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> ShadeError {
    #[cfg(feature = "hardware-errors")]
    {
        use shade_hardware::error::TransportError;
        if let Some(te) = e.downcast_ref::<TransportError>() {
            return match te {
                TransportError::Disconnected => ShadeError::Disconnected,
                TransportError::Timeout(_) => ShadeError::Timeout,
                other => ShadeError::Transport(other.to_string()),
            };
        }
    }

    if let Some(se) = e.downcast_ref::<ShadeError>() {
        return se.clone();
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("disconnected") {
        ShadeError::Disconnected
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ShadeError::Timeout
    } else {
        ShadeError::Transport(s)
    }
}
