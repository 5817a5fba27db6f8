// Error taxonomy
// Component-local failures (data, collaborators) are absorbed where they occur;
// configuration and run-level failures are the only ones surfaced to callers.
// Short candle history is local to one symbol and travels as
// `signal_generation::Rejection::InsufficientData` instead.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenerError {
    /// A collaborator call failed or was rate-limited
    #[error("{service} unavailable: {reason}")]
    ExternalUnavailable { service: &'static str, reason: String },

    /// Malformed thresholds or periods, detected at startup
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// Universe fetch failed or an unexpected error aborted the run
    #[error("run failed: {0}")]
    RunLevel(String),

    #[error("run cancelled by stop signal")]
    Cancelled,

    #[error("run timed out after {0:?}")]
    TimedOut(Duration),
}

impl ScreenerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }

    pub fn unavailable(service: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::ExternalUnavailable {
            service,
            reason: reason.to_string(),
        }
    }

    /// True for the failures that must reach the caller
    pub fn is_surfaced(&self) -> bool {
        !matches!(self, Self::ExternalUnavailable { .. })
    }
}
