//! Kernels behind the differentiable-operation surface.
//!
//! The public, documented entry points live in [`crate::backprop`]; this
//! module holds the CPU implementations. Each kernel returns its forward
//! output together with a boxed backward closure that maps the upstream
//! gradient to input gradients. Closures capture cloned data only, so
//! they outlive the tensors they were built from.
//!
//! GPU backends are deliberately absent: this crate reproduces the
//! numerical behavior of a training loop, not a kernel library.

use crate::tensors::Ten64;

pub mod cpu;

/// Backward closure of a unary op: upstream gradient in, input gradient out.
pub type GradFn = dyn Fn(&Ten64) -> Ten64;

/// Backward closure of a binary op: upstream gradient in, one gradient
/// per input out.
pub type GradPairFn = dyn Fn(&Ten64) -> (Ten64, Ten64);

/// Backward closure of a scalar loss: upstream scalar gradient in,
/// prediction-shaped gradient out.
pub type ScalarGradFn = dyn Fn(f64) -> Ten64;
