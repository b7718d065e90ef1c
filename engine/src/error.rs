//! Error taxonomy for the evolution engine.
//!
//! Every variant here represents a programmer or configuration error, never a
//! recoverable runtime condition: callers are expected to propagate these
//! immediately rather than retry. Boundary truncation of probability mass is
//! deliberately *not* an error (see [`crate::evolve`]), and non-convergence of
//! the stationary search is reported as a status, not through this type.

use thiserror::Error;

/// Errors raised by the settlement engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A network-delay bound larger than the supported maximum was requested.
    #[error("delta {delta} exceeds the supported maximum {max}")]
    DeltaOutOfRange { delta: u32, max: u32 },

    /// A margin outside the configured tracking window.
    #[error("margin {margin} lies outside the tracked window [{min}, {max}]")]
    MarginOutOfRange { margin: i32, min: i32, max: i32 },

    /// An automaton substate index outside the range implied by delta.
    #[error("automaton substate index {index} exceeds the range for delta {delta}")]
    SubstateOutOfRange { index: usize, delta: u32 },

    /// A Poisson weight was requested for a negative count.
    #[error("Poisson weight requested for negative count {count}")]
    NegativePoissonCount { count: i64 },

    /// A per-step success probability outside the open unit interval.
    #[error("probability {value} must lie strictly between 0 and 1")]
    InvalidProbability { value: f64 },

    /// A Poisson rate that is negative or non-finite.
    #[error("rate {value} must be non-negative and finite")]
    InvalidRate { value: f64 },

    /// A margin window with non-positive width.
    #[error("window half-width {width} must be positive")]
    InvalidWindow { width: i32 },

    /// Two distributions with incompatible grid shapes were combined.
    #[error("distribution shapes do not match: {left} cells vs {right} cells")]
    ShapeMismatch { left: usize, right: usize },

    /// A convergence threshold that is not a positive finite number.
    #[error("convergence threshold {value} must be positive and finite")]
    InvalidThreshold { value: f64 },
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
