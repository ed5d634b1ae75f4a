//! descent: a minimal backprop trainer for feed-forward classifiers.
//!
//! Implements the observable behavior of training a classifier with
//! stochastic gradient descent: differentiable building-block operations
//! with closure-based backward passes, a dense model ending in
//! log-softmax, gradient accumulation with an explicit clear contract,
//! and a batch-driven training loop that reports the mean loss per
//! epoch.
//!
//! # Goals
//!
//! - Prioritize correctness and explicitness over black-box abstraction.
//! - Keep the update contract airtight: accumulators are cleared before
//!   every backward pass and again by the update step itself.
//! - Make gradient tracking an explicit per-call choice, never ambient
//!   global state.
//!
//! # Modules
//!
//! - [`tensors`] — Flat row-major tensors and the parameter wrapper.
//! - [`backprop`] — Differentiable operations with backward closures.
//! - [`model`] — Dense layers, activations, and the classifier.
//! - [`data`] — Batches and restartable batch sources.
//! - [`loss`] — Negative log-likelihood and mean squared error.
//! - [`optim`] — Stochastic gradient descent.
//! - [`trainer`] — The forward/backward/update loop.
//! - [`metrics`] — Classification accuracy.
//!
//! # Example
//!
//! ```rust
//! use descent::data::InMemoryDataset;
//! use descent::loss::Loss;
//! use descent::model::{Activation, Classifier};
//! use descent::optim::Sgd;
//!
//! let mut model = Classifier::seeded(&[2, 8, 2], Activation::Relu, 42).unwrap();
//! let mut data = InMemoryDataset::new(
//!     vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0],
//!     vec![0, 1, 1, 0],
//!     2,
//!     2,
//!     4,
//! )
//! .unwrap()
//! .with_seed(42);
//! let mut opt = Sgd::with_lr(0.5);
//! let losses = descent::trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 5).unwrap();
//! assert_eq!(losses.len(), 5);
//! ```

pub mod backprop;
pub mod data;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod ops;
pub mod optim;
pub mod tensors;
pub mod trainer;

pub use error::{Error, Result};
