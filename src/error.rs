//! Error taxonomy for the training core.
//!
//! Every failure here is a programming or configuration error, not a
//! transient condition, so there are no retries: `run` and the model APIs
//! propagate immediately with `?` and the run terminates.
//!
//! Low-level kernels in [`crate::ops`] keep the panic-on-misuse contract
//! instead; the typed errors live at the API boundary (model, dataset,
//! trainer), which validates before any kernel is reached.

use thiserror::Error;

/// Fatal errors surfaced by the model, dataset, and trainer APIs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Input or label dimensionality disagrees with what the model declares.
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// What was being checked (e.g. `"batch inputs"`).
        what: &'static str,
        expected: String,
        got: String,
    },

    /// A gradient was requested before any backward pass populated it, or
    /// backward was requested from a forward pass that ran without
    /// gradient tracking.
    #[error("no gradient for {what}: no backward pass has populated it")]
    NoGradient {
        /// What was missing its gradient.
        what: &'static str,
    },

    /// The epoch count must be positive; reported before any work begins.
    #[error("invalid epoch count {epochs}: must be at least 1")]
    InvalidEpochCount { epochs: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
