// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Error types for the acquisition pipeline

use thiserror::Error;

/// Invalid configuration, detected at construction before any hardware
/// interaction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A duration that must be positive was zero.
    #[error("{name} must be positive")]
    NonPositiveDuration {
        /// Offending configuration field.
        name: &'static str,
    },

    /// A probability outside [0, 1].
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange {
        /// Offending configuration field.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// A tube number outside the detector.
    #[error("active tube {0} is outside 0-95")]
    TubeOutOfRange(u8),

    /// Queue capacity of zero.
    #[error("{name} capacity must be at least 1")]
    ZeroCapacity {
        /// Offending queue.
        name: &'static str,
    },

    /// Minimum-layers requirement outside 2-4.
    #[error("min_layers must be within 2-4, got {0}")]
    MinLayersOutOfRange(u8),

    /// Error-rate window or threshold that cannot trip.
    #[error("error policy invalid: {0}")]
    ErrorPolicy(&'static str),
}

/// A timing channel or trigger line failed to respond per protocol.
///
/// Distinct from a quiet channel: a channel with no hit reports `Ok(None)`,
/// a communication failure reports one of these. Both are absorbed into the
/// current event; only the sliding error-rate policy escalates them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    /// The channel did not answer within its timeout window.
    #[error("channel {tube} timed out after {timeout_ms} ms")]
    Timeout {
        /// Tube number of the silent channel.
        tube: u8,
        /// Configured timeout that elapsed.
        timeout_ms: u64,
    },

    /// The trigger line did not answer.
    #[error("trigger line unresponsive: {0}")]
    Trigger(String),

    /// The transport layer reported a fault.
    #[error("bus error on channel {tube}: {message}")]
    Bus {
        /// Tube number being addressed.
        tube: u8,
        /// Transport-level description.
        message: String,
    },
}

/// Error-rate threshold exceeded; fatal to the current run.
///
/// The engine latches this fault, drains to `Idle` and refuses to start
/// again until the fault is explicitly cleared.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "hardware health fault: error rate {rate:.2} over the last {window} \
     channel operations exceeds threshold (last error: {last_error})"
)]
pub struct HealthFault {
    /// Observed error rate over the window.
    pub rate: f64,
    /// Number of channel operations in the window.
    pub window: usize,
    /// The most recent communication error.
    pub last_error: ChannelError,
}

/// Reasons the engine refuses to start.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StartError {
    /// The engine is not idle.
    #[error("engine is already running")]
    AlreadyRunning,

    /// A previous run tripped the health policy and the fault is still latched.
    #[error("health fault latched, clear it before restarting: {0}")]
    Faulted(HealthFault),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = ChannelError::Timeout {
            tube: 17,
            timeout_ms: 5,
        };
        assert_eq!(err.to_string(), "channel 17 timed out after 5 ms");

        let fault = HealthFault {
            rate: 0.5,
            window: 200,
            last_error: err,
        };
        assert!(fault.to_string().contains("0.50"));
        assert!(fault.to_string().contains("200"));
    }
}
