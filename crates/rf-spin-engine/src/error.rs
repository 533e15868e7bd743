//! Error types for the spin engine

use thiserror::Error;

/// Spin engine error type
///
/// Every variant is raised before any session state is written back, so a
/// failed spin never leaves a partially applied result behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpinError {
    #[error("Invalid bet {bet}: must be within [{min}, {max}]")]
    InvalidBet { bet: f64, min: f64, max: f64 },

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Cascade overflow: more than {limit} cascade steps in one spin")]
    CascadeOverflow { limit: u32 },

    #[error("Session busy: a spin is already running for session {0}")]
    SessionBusy(String),

    #[error("Accumulator divergence: client reached {observed}, server says {expected}")]
    AccumulatorDivergence { expected: f64, observed: f64 },

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SpinError {
    /// Fatal errors indicate a configuration bug rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CascadeOverflow { .. } | Self::InvalidConfig(_))
    }

    /// The caller may resubmit the identical request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SessionBusy(_))
    }
}

impl From<serde_json::Error> for SpinError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yml::Error> for SpinError {
    fn from(e: serde_yml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias
pub type EngineResult<T> = Result<T, SpinError>;
