//! Optimizers.
//!
//! Plain stochastic gradient descent is all the trainer needs: a
//! learning rate and no per-parameter memory. The [`Optimizer`] trait
//! exists so a stateful optimizer can slot into the same trainer loop.

use crate::backprop;
use crate::error::Result;
use crate::tensors::{Ten64, WithGrad};

/// Consumes accumulated gradients to update parameters in place.
pub trait Optimizer {
    /// Applies one update to every parameter and clears its accumulator.
    ///
    /// # Errors
    /// [`Error::NoGradient`](crate::error::Error::NoGradient) if any
    /// parameter has no populated accumulator.
    fn step(&mut self, params: &mut [&mut WithGrad<Ten64>]) -> Result<()>;

    /// The current learning rate.
    fn lr(&self) -> f64;
}

/// Plain stochastic gradient descent: `param <- param - lr * grad`.
///
/// # Example
///
/// ```rust
/// use descent::optim::{Optimizer, Sgd};
/// use descent::tensors::WithGrad;
/// use descent::tensor;
///
/// let mut w = WithGrad::new(tensor!([2.0]));
/// w.accumulate(&tensor!([4.0]));
/// let mut opt = Sgd::with_lr(0.01);
/// opt.step(&mut [&mut w]).unwrap();
/// assert_eq!(w.value.data, vec![1.96]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    lr: f64,
}

impl Sgd {
    /// Creates an optimizer with the given learning rate.
    pub fn with_lr(lr: f64) -> Self {
        debug_assert!(lr.is_finite() && lr > 0.0, "learning rate must be positive");
        Self { lr }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [&mut WithGrad<Ten64>]) -> Result<()> {
        for p in params {
            backprop::sgd(p, self.lr)?;
        }
        Ok(())
    }

    fn lr(&self) -> f64 {
        self.lr
    }
}
