//! Loss selection for the trainer.
//!
//! The model always emits log-probabilities, so both losses are defined
//! over them: negative log-likelihood indexes the true class directly,
//! while the mean-squared-error variant compares against one-hot targets
//! the way early classifier examples train before switching to NLL.

use crate::backprop;
use crate::tensors::{Ten64, Tensor};

/// Scalar loss applied to a batch of log-probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// Negative log-likelihood of the true class, averaged over the batch.
    Nll,
    /// Mean squared error against one-hot targets.
    Mse,
}

impl Loss {
    /// Evaluates the loss and its gradient with respect to the
    /// log-probabilities (upstream gradient fixed at `1.0`).
    ///
    /// # Panics
    /// Panics if `labels` does not hold one in-range index per row of
    /// `log_probs`.
    pub fn evaluate(self, log_probs: &Ten64, labels: &[usize]) -> (f64, Ten64) {
        match self {
            Self::Nll => {
                let (loss, back) = backprop::nll_loss(log_probs, labels);
                (loss, back(1.0))
            }
            Self::Mse => {
                let targets = one_hot(labels, log_probs.shape[1]);
                let (loss, back) = backprop::mse_loss(log_probs, &targets);
                (loss, back(1.0))
            }
        }
    }
}

/// Encodes class labels as one-hot rows.
///
/// # Panics
/// Panics if any label is not below `num_classes`.
pub fn one_hot(labels: &[usize], num_classes: usize) -> Ten64 {
    let mut data = vec![0.0; labels.len() * num_classes];
    for (i, &label) in labels.iter().enumerate() {
        assert!(
            label < num_classes,
            "label {label} out of range for {num_classes} classes"
        );
        data[i * num_classes + label] = 1.0;
    }
    Tensor::new(vec![labels.len(), num_classes], data)
}
