//! Differentiable operations.
//!
//! Provides the forward/backward building blocks the trainer and model
//! are assembled from.
//!
//! ## Autograd Pattern
//!
//! Each operation follows the same shape:
//! 1. **Forward pass** computes an output from plain tensor values.
//! 2. **Backward pass** is returned as a closure capturing the cloned
//!    data it needs to map the upstream gradient to input gradients.
//! 3. **Gradient application** sums those results into a parameter's
//!    accumulator via [`WithGrad::accumulate`], and
//!    [`sgd`] consumes the accumulator to update the value.
//!
//! ## Usage Guidelines
//!
//! - Operations **panic** on shape mismatches; the model and trainer
//!   validate shapes before any kernel runs and surface typed errors.
//! - Backward closures implement `Fn`, allowing multiple invocations.
//!
//! [`WithGrad::accumulate`]: crate::tensors::WithGrad::accumulate

use crate::error::Result;
use crate::ops::{self, GradFn, GradPairFn, ScalarGradFn};
use crate::tensors::{Ten64, WithGrad};

/// Performs matrix multiplication of two 2-D tensors: `a` (m x k) times
/// `b` (k x n).
///
/// # Returns
/// - `out`: Product tensor (m x n).
/// - `back`: Closure that given `dL/d(out)` returns `(dL/d(a), dL/d(b))`.
///
/// # Panics
/// Panics if the inner dimensions do not match (`a.shape[1] != b.shape[0]`).
///
/// # Example
/// ```rust
/// use descent::backprop::matmul;
/// use descent::tensor;
///
/// let a = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// let b = tensor!([[5.0, 6.0], [7.0, 8.0]]);
/// let (c, back) = matmul(&a, &b);
/// assert_eq!(c.data, vec![19.0, 22.0, 43.0, 50.0]);
/// let (da, db) = back(&tensor!([[1.0, 0.0], [0.0, 1.0]]));
/// assert_eq!(da.shape, a.shape);
/// assert_eq!(db.shape, b.shape);
/// ```
pub fn matmul(a: &Ten64, b: &Ten64) -> (Ten64, Box<GradPairFn>) {
    ops::cpu::matmul(a, b)
}

/// Adds a bias vector to every row of a 2-D tensor.
///
/// # Returns
/// - `out`: Input with the bias row added.
/// - `back`: Closure mapping `dL/d(out)` to `(dL/d(x), dL/d(bias))`.
///
/// # Panics
/// Panics if `bias` is not a vector of width `x.shape[1]`.
pub fn add_bias(x: &Ten64, bias: &Ten64) -> (Ten64, Box<GradPairFn>) {
    ops::cpu::add_bias(x, bias)
}

/// Applies the ReLU activation (Rectified Linear Unit): `max(0, x)`
/// elementwise.
///
/// # Returns
/// - `out`: Tensor with negatives zeroed.
/// - `back`: Closure mapping `dL/d(out)` to `dL/d(input)` by passing
///   gradients only where the input was positive.
///
/// # Example
/// ```rust
/// use descent::backprop::relu;
/// use descent::tensor;
///
/// let (out, back) = relu(&tensor!([-1.0, 0.0, 2.0]));
/// assert_eq!(out.data, vec![0.0, 0.0, 2.0]);
/// let grad_in = back(&tensor!([1.0, 1.0, 1.0]));
/// assert_eq!(grad_in.data, vec![0.0, 0.0, 1.0]);
/// ```
pub fn relu(input: &Ten64) -> (Ten64, Box<GradFn>) {
    ops::cpu::relu(input)
}

/// Applies the logistic sigmoid elementwise.
///
/// # Returns
/// - `out`: `1 / (1 + exp(-x))` per element.
/// - `back`: Closure computing `dy * s * (1 - s)` from the saved output.
pub fn sigmoid(input: &Ten64) -> (Ten64, Box<GradFn>) {
    ops::cpu::sigmoid(input)
}

/// Maps raw class scores to log-probabilities along the class axis.
///
/// For each row of an `n x c` matrix:
/// `out[i, j] = score[i, j] - log(sum_k exp(score[i, k]))`, computed with
/// the row maximum subtracted before exponentiating so large scores do
/// not overflow. Exponentiating a result row always yields a valid
/// probability distribution.
///
/// # Example
/// ```rust
/// use descent::backprop::log_softmax;
/// use descent::tensor;
///
/// let (logp, _back) = log_softmax(&tensor!([[1000.0, 1000.0, 1000.0]]));
/// let total: f64 = logp.data.iter().map(|lp| lp.exp()).sum();
/// assert!((total - 1.0).abs() < 1e-12);
/// ```
pub fn log_softmax(scores: &Ten64) -> (Ten64, Box<GradFn>) {
    ops::cpu::log_softmax(scores)
}

/// Computes mean squared error: `sum((y - t)^2) / (2n)`.
///
/// # Returns
/// - Scalar loss value.
/// - Closure that maps `dL/dloss` into a gradient of the prediction's
///   shape.
///
/// # Panics
/// Panics if the shapes of `prediction` and `target` differ.
pub fn mse_loss(prediction: &Ten64, target: &Ten64) -> (f64, Box<ScalarGradFn>) {
    ops::cpu::mse_loss(prediction, target)
}

/// Computes negative log-likelihood from log-probabilities and integer
/// class labels: `-(1/n) * sum_i log_probs[i, labels[i]]`.
///
/// Non-negative whenever the input rows are valid log-probabilities.
///
/// # Returns
/// - Scalar loss value.
/// - Closure that maps `dL/dloss` into a gradient of the prediction's
///   shape (nonzero only at each example's true class).
///
/// # Panics
/// Panics if `labels` does not hold one in-range index per row.
pub fn nll_loss(log_probs: &Ten64, labels: &[usize]) -> (f64, Box<ScalarGradFn>) {
    ops::cpu::nll_loss(log_probs, labels)
}

/// Performs an in-place stochastic gradient descent update.
///
/// Applies `param = param - lr * gradient` and clears the accumulator;
/// see [`WithGrad::step`](crate::tensors::WithGrad::step).
///
/// # Errors
/// [`Error::NoGradient`](crate::error::Error::NoGradient) if no backward
/// pass has populated the accumulator.
pub fn sgd(w: &mut WithGrad<Ten64>, lr: f64) -> Result<()> {
    w.step(lr)
}
