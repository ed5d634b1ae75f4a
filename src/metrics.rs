//! Classification metrics.

use crate::tensors::Ten64;

/// Fraction of examples whose highest log-probability matches the label.
///
/// # Panics
/// Panics if `log_probs` is not 2-D with one row per label.
pub fn accuracy(log_probs: &Ten64, labels: &[usize]) -> f64 {
    assert_eq!(log_probs.shape.len(), 2, "log_probs must be 2-D");
    let (n, c) = (log_probs.shape[0], log_probs.shape[1]);
    assert_eq!(labels.len(), n, "one label per example required");

    let hits = log_probs
        .data
        .chunks(c)
        .zip(labels)
        .filter(|&(ref row, &label)| {
            let best = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(j, _)| j);
            best == Some(label)
        })
        .count();
    hits as f64 / n as f64
}
