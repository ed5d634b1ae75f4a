//! Core tensor data structures.
//!
//! This module defines the flat row-major tensor the rest of the crate
//! computes with, and the [`WithGrad`] wrapper that pairs a parameter
//! value with its gradient accumulator.
//!
//! ## Design Highlights
//! - Tensors are strongly typed: `Tensor<T>` for any element type; the
//!   crate computes in `f64` via the [`Ten64`] alias
//! - Shape is stored as a `Vec<usize>` and enforced at runtime
//! - A gradient accumulator starts *absent* (distinct from a zero
//!   tensor) and sums contributions until explicitly cleared
//! - The `tensor!` macro builds 1-D and 2-D tensors from literals
//!
//! ## Limitations
//! - Row-major only
//! - No broadcasting, slicing, or shape inference
//!
//! ## Example
//!
//! ```rust
//! use descent::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![2, 3]);
//! ```

use crate::error::{Error, Result};

/// An N-dimensional tensor with a shape and flat row-major data.
///
/// - All elements must be the same type (`T`).
/// - `shape` defines the structure, e.g., `[2, 3]` for a 2x3 matrix.
/// - `data` holds the flattened content in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

/// The `f64` tensor every kernel in this crate operates on.
pub type Ten64 = Tensor<f64>;

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Ten64 {
    /// Creates a tensor of the given shape filled with zeros.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
        }
    }

    /// Creates a zero tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }
}

/// A parameter value paired with its gradient accumulator.
///
/// The accumulator starts out absent, which is not the same thing as a
/// zero tensor: reading it before a backward pass has populated it is an
/// error ([`Error::NoGradient`]), while a zero gradient after a backward
/// pass is a legitimate value. Backward passes *sum* into the accumulator
/// via [`WithGrad::accumulate`]; the sum keeps growing until
/// [`WithGrad::clear_grad`] or [`WithGrad::step`] resets it to absent.
///
/// # Example
///
/// ```rust
/// use descent::{tensor, tensors::WithGrad};
///
/// let mut w = WithGrad::new(tensor!([2.0]));
/// assert!(w.grad().is_none());
/// w.accumulate(&tensor!([4.0]));
/// w.step(0.01).unwrap();
/// assert_eq!(w.value.data, vec![1.96]);
/// assert!(w.grad().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct WithGrad<T> {
    pub value: T,
    grad: Option<T>,
}

impl<T> WithGrad<T> {
    /// Wraps a value with an absent gradient accumulator.
    pub fn new(value: T) -> Self {
        Self { value, grad: None }
    }

    /// The accumulated gradient, or `None` if no backward pass has
    /// populated it since the last clear.
    pub fn grad(&self) -> Option<&T> {
        self.grad.as_ref()
    }

    /// Resets the accumulator to absent.
    pub fn clear_grad(&mut self) {
        self.grad = None;
    }
}

impl WithGrad<Ten64> {
    /// Sums `delta` into the gradient accumulator, initializing it from
    /// zero if it was absent.
    ///
    /// # Panics
    /// Panics if `delta` has a different shape than the value.
    pub fn accumulate(&mut self, delta: &Ten64) {
        assert_eq!(
            self.value.shape, delta.shape,
            "gradient shape {:?} does not match parameter shape {:?}",
            delta.shape, self.value.shape
        );
        let grad = self.grad.get_or_insert_with(|| self.value.zeros_like());
        for (g, d) in grad.data.iter_mut().zip(&delta.data) {
            *g += d;
        }
    }

    /// Applies one gradient-descent update in place:
    /// `value <- value - lr * grad`, then clears the accumulator.
    ///
    /// Clearing is a postcondition of the update, so a caller cannot
    /// blend this batch's gradient into the next batch by forgetting a
    /// reset.
    ///
    /// # Errors
    /// [`Error::NoGradient`] if the accumulator is absent.
    pub fn step(&mut self, lr: f64) -> Result<()> {
        let grad = self.grad.take().ok_or(Error::NoGradient {
            what: "parameter update",
        })?;
        for (w, g) in self.value.data.iter_mut().zip(&grad.data) {
            *w -= lr * g;
        }
        Ok(())
    }
}

/// Builds a [`Ten64`] from a 1-D or 2-D literal.
///
/// Rows of a 2-D literal must all have the same length.
///
/// # Example
/// ```
/// use descent::tensor;
/// let v = tensor!([1.0, 2.0, 3.0]);
/// assert_eq!(v.shape, vec![3]);
/// let m = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(m.shape, vec![2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ([ $( [ $( $x:expr ),+ $(,)? ] ),+ $(,)? ]) => {{
        let rows: ::std::vec::Vec<::std::vec::Vec<f64>> =
            vec![ $( vec![ $( $x ),+ ] ),+ ];
        let cols = rows[0].len();
        assert!(
            rows.iter().all(|r| r.len() == cols),
            "ragged tensor literal (rows have mismatched lengths)"
        );
        let shape = vec![rows.len(), cols];
        let data: ::std::vec::Vec<f64> = rows.into_iter().flatten().collect();
        $crate::tensors::Tensor::new(shape, data)
    }};

    ([ $( $x:expr ),+ $(,)? ]) => {{
        let data: ::std::vec::Vec<f64> = vec![ $( $x ),+ ];
        let shape = vec![data.len()];
        $crate::tensors::Tensor::new(shape, data)
    }};
}
