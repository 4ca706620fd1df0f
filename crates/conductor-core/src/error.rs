//! Error types for conductor-core.

use thiserror::Error;

/// Error type for conductor-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid tempo: {0}. Must be a finite value greater than 0 BPM")]
    InvalidTempo(f64),

    /// Not enough predictions yet to decide a condition. Callers treat this
    /// as "defer", not as a failure.
    #[error("Incomplete history: need {needed} predictions, have {available}")]
    IncompleteHistory { needed: usize, available: usize },
}

impl Error {
    /// True for the defer signal produced while history is still filling up.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::IncompleteHistory { .. })
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
