//! Error types for sampler construction and chain runs.

use thiserror::Error;

use crate::core::ChainState;

/// Invalid sampler configuration, detected before any sampling happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The sample space must have at least one dimension.
    #[error("dimension must be positive")]
    ZeroDimension,

    /// A mixture needs at least one component.
    #[error("mixture must have at least one component")]
    NoComponents,

    /// Number of means, covariances or weights disagrees with `K`.
    #[error("expected {expected} {what}, got {actual}")]
    ComponentCountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A vector has the wrong length for the sample space.
    #[error("{what} has length {actual}, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A covariance matrix is not `dim x dim`.
    #[error("{what} has shape {rows}x{cols}, expected {dim}x{dim}")]
    NonSquareCovariance {
        what: String,
        rows: usize,
        cols: usize,
        dim: usize,
    },

    /// A covariance matrix is not symmetric within tolerance.
    #[error("{what} is not symmetric")]
    NonSymmetricCovariance { what: String },

    /// Cholesky factorisation failed.
    #[error("{what} is not positive definite")]
    NotPositiveDefinite { what: String },

    /// A mixing weight is negative or not finite.
    #[error("weight {index} is invalid: {value}")]
    InvalidWeight { index: usize, value: f64 },

    /// Mixing weights do not sum to one.
    #[error("weights sum to {sum}, expected 1 (tolerance {tolerance})")]
    WeightsNotNormalized { sum: f64, tolerance: f64 },

    /// A chain needs at least one state.
    #[error("num_samples must be positive")]
    ZeroSamples,
}

/// Failure while evaluating a density or a Hastings ratio.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalError {
    /// Point passed to a density has the wrong length.
    #[error("point has length {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The triangular solve of the Mahalanobis term broke down.
    #[error("covariance factor is singular")]
    SingularCovariance,

    /// A density evaluation produced a value that is not a valid log-density.
    #[error("{what} evaluated to {value}")]
    NonFinite { what: &'static str, value: f64 },

    /// Both the current and the proposed state have zero target density.
    #[error("degenerate Hastings ratio at step {step}: current and proposed densities are both zero")]
    DegenerateRatio { step: usize },
}

/// Reason a chain run stopped before writing every state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    #[error(transparent)]
    Numerical(#[from] NumericalError),

    /// Cancelled through a [`CancelToken`](crate::core::CancelToken).
    #[error("run cancelled after {filled} states")]
    Cancelled { filled: usize },
}

/// A run that did not complete.
///
/// Carries the chain as far as it was written so that the prefix can be
/// inspected; [`ChainState::is_complete`] is always `false` here.
#[derive(Debug, Error)]
#[error("sampling aborted after {} of {} states: {source}", .partial.filled(), .partial.num_samples())]
pub struct RunError {
    #[source]
    pub source: SamplerError,
    pub partial: ChainState,
}
