//! Construction-time errors.
//!
//! Only configuration and input validation is recoverable. Misuse inside a round
//! (unknown arm, unknown context) is a programming error and panics.

use thiserror::Error;

/// Errors returned while parsing or building simulation components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unknown algorithm id `{0}`")]
    UnknownAlgorithm(String),

    #[error("unknown algorithm family `{0}`")]
    UnknownFamily(String),

    #[error("algorithm `{algorithm}` needs a sliding window size")]
    MissingWindowSize { algorithm: String },

    #[error("window size must be >= 1")]
    InvalidWindowSize,

    #[error("at least one arm is required")]
    NoArms,

    #[error("{prices} prices given for {arms} arms")]
    PriceCountMismatch { arms: usize, prices: usize },

    #[error("prices must be finite and non-negative, got {value}")]
    InvalidPrice { value: f64 },

    #[error("probability {value} is outside [0, 1]")]
    InvalidProbability { value: f64 },

    #[error("{what}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("time horizon must be >= 1")]
    InvalidHorizon,

    #[error("phase length must be >= 1")]
    InvalidPhaseLength,

    #[error("at least one context is required")]
    NoContexts,

    #[error("provider returned a {actual} table where a {expected} table was needed")]
    TableKindMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
