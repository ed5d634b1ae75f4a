//! CPU tensor kernels.
//!
//! ## Features
//!
//! - Parallel execution using [`rayon`](https://docs.rs/rayon) for the
//!   matmul and elementwise kernels
//! - Plain row loops for the softmax-family kernels, whose per-row work
//!   is too small to be worth splitting
//!
//! ## Design Goals
//!
//! - Deterministic row results (each output row is reduced serially)
//! - Shape misuse is a programmer error and panics; `Result`-typed
//!   validation happens at the model/trainer boundary before kernels run
//!
//! ## Implemented Ops
//!
//! - `matmul`, `add_bias`: the affine layer
//! - `relu`, `sigmoid`: activations
//! - `log_softmax`: numerically stable log-probabilities
//! - `mse_loss`, `nll_loss`: scalar losses with gradient generators

use super::{GradFn, GradPairFn, ScalarGradFn};
use crate::tensors::{Ten64, Tensor};
use rayon::prelude::*;

/// Matrix product `C = A x B` for `A: m x k`, `B: k x n`.
///
/// Returns the `m x n` output and a closure mapping `dL/dC` to
/// `(dL/dA, dL/dB)`.
///
/// # Panics
/// Panics if either input is not 2-D or the inner dimensions disagree.
pub fn matmul(a: &Ten64, b: &Ten64) -> (Ten64, Box<GradPairFn>) {
    assert_eq!(a.shape.len(), 2, "matmul lhs must be 2-D");
    assert_eq!(b.shape.len(), 2, "matmul rhs must be 2-D");
    let (m, k) = (a.shape[0], a.shape[1]);
    let n = b.shape[1];
    assert_eq!(k, b.shape[0], "matmul shape mismatch");

    let a_data = &a.data;
    let b_data = &b.data;

    let mut out_data = vec![0.0; m * n];
    out_data.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for l in 0..k {
            let a_il = a_data[i * k + l];
            for (j, out) in row.iter_mut().enumerate() {
                *out += a_il * b_data[l * n + j];
            }
        }
    });
    let out = Tensor::new(vec![m, n], out_data);

    let a_val = a.clone();
    let b_val = b.clone();
    let back = move |grad: &Ten64| {
        assert_eq!(grad.shape, vec![m, n], "matmul upstream gradient shape");

        // dA = g . B^T
        let mut da = vec![0.0; m * k];
        da.par_chunks_mut(k).enumerate().for_each(|(i, row)| {
            for (l, out) in row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for j in 0..n {
                    sum += grad.data[i * n + j] * b_val.data[l * n + j];
                }
                *out = sum;
            }
        });

        // dB = A^T . g
        let mut db = vec![0.0; k * n];
        for i in 0..m {
            for l in 0..k {
                let a_il = a_val.data[i * k + l];
                for j in 0..n {
                    db[l * n + j] += a_il * grad.data[i * n + j];
                }
            }
        }

        (
            Tensor::new(vec![m, k], da),
            Tensor::new(vec![k, n], db),
        )
    };

    (out, Box::new(back))
}

/// Adds a bias row to every row of a 2-D tensor.
///
/// Returns the biased output and a closure mapping `dL/dout` to
/// `(dL/dx, dL/dbias)`; the bias gradient is the column sum of the
/// upstream gradient.
///
/// # Panics
/// Panics if `x` is not 2-D or `bias` is not a vector of width
/// `x.shape[1]`.
pub fn add_bias(x: &Ten64, bias: &Ten64) -> (Ten64, Box<GradPairFn>) {
    assert_eq!(x.shape.len(), 2, "add_bias input must be 2-D");
    let (n, d) = (x.shape[0], x.shape[1]);
    assert_eq!(bias.shape, vec![d], "bias width must match input width");

    let mut out_data = x.data.clone();
    for row in out_data.chunks_mut(d) {
        for (y, b) in row.iter_mut().zip(&bias.data) {
            *y += b;
        }
    }
    let out = Tensor::new(vec![n, d], out_data);

    let back = move |grad: &Ten64| {
        assert_eq!(grad.shape, vec![n, d], "add_bias upstream gradient shape");
        let mut db = vec![0.0; d];
        for row in grad.data.chunks(d) {
            for (acc, g) in db.iter_mut().zip(row) {
                *acc += g;
            }
        }
        (grad.clone(), Tensor::new(vec![d], db))
    };

    (out, Box::new(back))
}

/// ReLU activation: `max(0, x)` elementwise.
///
/// The backward closure passes the upstream gradient only where the
/// input was strictly positive.
pub fn relu(input: &Ten64) -> (Ten64, Box<GradFn>) {
    let shape = input.shape.clone();
    let data: Vec<f64> = input
        .data
        .par_iter()
        .map(|&x| if x > 0.0 { x } else { 0.0 })
        .collect();
    let out = Tensor::new(shape.clone(), data);

    let input_data = input.data.clone();
    let back = move |grad_output: &Ten64| {
        let grad: Vec<f64> = input_data
            .par_iter()
            .zip(&grad_output.data)
            .map(|(&x, &dy)| if x > 0.0 { dy } else { 0.0 })
            .collect();
        Tensor::new(shape.clone(), grad)
    };

    (out, Box::new(back))
}

/// Logistic sigmoid: `1 / (1 + exp(-x))` elementwise.
///
/// The backward closure uses the saved output: `dx = dy * s * (1 - s)`.
pub fn sigmoid(input: &Ten64) -> (Ten64, Box<GradFn>) {
    let shape = input.shape.clone();
    let data: Vec<f64> = input
        .data
        .par_iter()
        .map(|&x| 1.0 / (1.0 + (-x).exp()))
        .collect();
    let out = Tensor::new(shape.clone(), data.clone());

    let back = move |grad_output: &Ten64| {
        let grad: Vec<f64> = data
            .par_iter()
            .zip(&grad_output.data)
            .map(|(&s, &dy)| dy * s * (1.0 - s))
            .collect();
        Tensor::new(shape.clone(), grad)
    };

    (out, Box::new(back))
}

/// Log-softmax along the class axis of an `n x c` score matrix.
///
/// For each row: `out[j] = x[j] - log(sum_k exp(x[k]))`, computed with
/// the row maximum subtracted before exponentiating so rows like
/// `[1000, 1000, 1000]` do not overflow.
///
/// The backward closure maps `dy` to
/// `dx[j] = dy[j] - exp(out[j]) * sum_k dy[k]` per row.
///
/// # Panics
/// Panics if `scores` is not 2-D.
pub fn log_softmax(scores: &Ten64) -> (Ten64, Box<GradFn>) {
    assert_eq!(scores.shape.len(), 2, "log_softmax input must be 2-D");
    let (n, c) = (scores.shape[0], scores.shape[1]);

    let mut out_data = vec![0.0; n * c];
    for i in 0..n {
        let row = &scores.data[i * c..(i + 1) * c];
        let max_val = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let log_sum = row.iter().map(|&x| (x - max_val).exp()).sum::<f64>().ln();
        for j in 0..c {
            out_data[i * c + j] = row[j] - max_val - log_sum;
        }
    }
    let out = Tensor::new(vec![n, c], out_data.clone());

    let back = move |grad_output: &Ten64| {
        assert_eq!(
            grad_output.shape,
            vec![n, c],
            "log_softmax upstream gradient shape"
        );
        let mut grad = vec![0.0; n * c];
        for i in 0..n {
            let dy = &grad_output.data[i * c..(i + 1) * c];
            let dot: f64 = dy.iter().sum();
            for j in 0..c {
                grad[i * c + j] = dy[j] - out_data[i * c + j].exp() * dot;
            }
        }
        Tensor::new(vec![n, c], grad)
    };

    (out, Box::new(back))
}

/// Mean squared error: `sum((y - t)^2) / (2n)` over all `n` elements.
///
/// The backward closure maps an upstream scalar `g` to the gradient
/// tensor `(y - t) * g / n`.
///
/// # Panics
/// Panics if the shapes of `prediction` and `target` differ.
pub fn mse_loss(prediction: &Ten64, target: &Ten64) -> (f64, Box<ScalarGradFn>) {
    assert_eq!(
        prediction.shape, target.shape,
        "mse_loss shape mismatch"
    );
    let n = prediction.len() as f64;

    let loss = prediction
        .data
        .par_iter()
        .zip(&target.data)
        .map(|(&y, &t)| (y - t) * (y - t))
        .sum::<f64>()
        / (2.0 * n);

    let shape = prediction.shape.clone();
    let pred_data = prediction.data.clone();
    let target_data = target.data.clone();
    let back = move |grad_output: f64| {
        let grad: Vec<f64> = pred_data
            .par_iter()
            .zip(&target_data)
            .map(|(&y, &t)| (y - t) * grad_output / n)
            .collect();
        Tensor::new(shape.clone(), grad)
    };

    (loss, Box::new(back))
}

/// Negative log-likelihood over an `n x c` log-probability matrix:
/// `-(1/n) * sum_i log_probs[i, labels[i]]`.
///
/// The backward closure maps an upstream scalar `g` to a tensor that is
/// `-g / n` at each example's true class and zero elsewhere.
///
/// # Panics
/// Panics if `log_probs` is not 2-D, `labels` does not have one entry
/// per row, or any label index is out of range.
pub fn nll_loss(log_probs: &Ten64, labels: &[usize]) -> (f64, Box<ScalarGradFn>) {
    assert_eq!(log_probs.shape.len(), 2, "nll_loss input must be 2-D");
    let (n, c) = (log_probs.shape[0], log_probs.shape[1]);
    assert_eq!(labels.len(), n, "one label per example required");

    let mut picked = 0.0;
    for (i, &label) in labels.iter().enumerate() {
        assert!(label < c, "label {label} out of range for {c} classes");
        picked += log_probs.data[i * c + label];
    }
    let loss = -picked / n as f64;

    let labels = labels.to_vec();
    let back = move |grad_output: f64| {
        let mut grad = vec![0.0; n * c];
        for (i, &label) in labels.iter().enumerate() {
            grad[i * c + label] = -grad_output / n as f64;
        }
        Tensor::new(vec![n, c], grad)
    };

    (loss, Box::new(back))
}
