//! Fitting error types

use thiserror::Error;

/// Errors that can occur while fitting inhibition parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// The zero-inhibitor reference simulation produced no product, so the
    /// response scale is undefined. Typically zero added substrate or a zero
    /// incubation time on the first observation.
    #[error(
        "response scale undefined: zero-inhibitor reference produced no signal \
         (added substrate {added_substrate}, incubation time {incubation_time})"
    )]
    ZeroReferenceSignal {
        added_substrate: f64,
        incubation_time: f64,
    },

    /// The damped normal equations could not be solved even at maximal damping
    #[error("normal equations are singular; residuals or Jacobian are not finite")]
    SingularNormalEquations,

    /// Mismatched vector lengths at the solver boundary
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid box constraints
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// Failure reported by the optimization backend
    #[error("optimizer failure: {0}")]
    Optimizer(String),
}
