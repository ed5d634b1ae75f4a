//! The training loop.
//!
//! [`run`] owns nothing: the model, optimizer, and batch source persist
//! by reference across calls, and the loop itself is stateless between
//! invocations. Forward pass, loss computation, backward pass, and
//! parameter update execute strictly in that order with no interleaving;
//! the only mutation paths are gradient accumulation and the optimizer's
//! update step.
//!
//! Gradient accumulators are cleared before every batch's backward pass.
//! The optimizer's step also clears them as a postcondition, so the
//! explicit clear only matters for foreign [`BatchSource`] or manual
//! loops that skipped an update; the trainer performs both so neither
//! path can blend gradients across unrelated batches.

use crate::data::BatchSource;
use crate::error::{Error, Result};
use crate::loss::Loss;
use crate::model::{Classifier, GradMode};
use crate::optim::Optimizer;

/// Trains `model` for `epochs` full traversals of `source`, printing
/// `Training loss: <mean>` after each epoch and returning the per-epoch
/// mean training losses.
///
/// Each batch goes through one forward/backward/update cycle:
/// clear accumulators, forward with tracking, evaluate the scalar loss,
/// run the backward tape, apply the optimizer. The mean of the scalar
/// losses over the epoch's batches is the epoch's reported loss.
///
/// # Errors
/// - [`Error::InvalidEpochCount`] if `epochs` is zero (checked before
///   any work).
/// - [`Error::ShapeMismatch`] if the source's declared dimensions
///   disagree with the model's, or a yielded batch violates them.
/// - [`Error::NoGradient`] if an update runs without populated
///   gradients.
///
/// # Example
///
/// ```rust
/// use descent::data::InMemoryDataset;
/// use descent::loss::Loss;
/// use descent::model::{Activation, Classifier};
/// use descent::optim::Sgd;
///
/// let mut model = Classifier::seeded(&[2, 4, 2], Activation::Relu, 3).unwrap();
/// let mut data = InMemoryDataset::new(
///     vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0],
///     vec![0, 0, 1, 1],
///     2,
///     2,
///     2,
/// )
/// .unwrap()
/// .with_seed(5);
/// let mut opt = Sgd::with_lr(0.1);
/// let losses = descent::trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 3).unwrap();
/// assert_eq!(losses.len(), 3);
/// ```
pub fn run<O, S>(
    model: &mut Classifier,
    loss: Loss,
    optimizer: &mut O,
    source: &mut S,
    epochs: usize,
) -> Result<Vec<f64>>
where
    O: Optimizer,
    S: BatchSource + ?Sized,
{
    if epochs == 0 {
        return Err(Error::InvalidEpochCount { epochs });
    }
    if source.input_dim() != model.input_dim() {
        return Err(Error::ShapeMismatch {
            what: "source input width",
            expected: model.input_dim().to_string(),
            got: source.input_dim().to_string(),
        });
    }
    if source.num_classes() != model.num_classes() {
        return Err(Error::ShapeMismatch {
            what: "source class count",
            expected: model.num_classes().to_string(),
            got: source.num_classes().to_string(),
        });
    }

    let mut history = Vec::with_capacity(epochs);
    for epoch in 1..=epochs {
        let mut total = 0.0;
        let mut batches = 0usize;

        for batch in source.batches() {
            validate_batch(model, &batch.inputs.shape, &batch.labels)?;

            // Accumulators sum across backward passes; clearing here is
            // what keeps this batch's descent direction free of the
            // previous batch's gradient.
            model.zero_grad();

            let fwd = model.forward(&batch.inputs, GradMode::Tracked)?;
            let (batch_loss, grad) = loss.evaluate(&fwd.output, &batch.labels);
            model.backward(fwd.tape()?, &grad);
            optimizer.step(&mut model.params_mut())?;

            total += batch_loss;
            batches += 1;
            log::debug!("epoch {epoch} batch {batches}: loss {batch_loss}");
        }

        debug_assert!(batches > 0, "batch source yielded an empty epoch");
        let mean = total / batches as f64;
        println!("Training loss: {mean}");
        history.push(mean);
    }
    Ok(history)
}

fn validate_batch(model: &Classifier, shape: &[usize], labels: &[usize]) -> Result<()> {
    if shape.len() != 2 || shape[1] != model.input_dim() {
        return Err(Error::ShapeMismatch {
            what: "batch inputs",
            expected: format!("[n, {}]", model.input_dim()),
            got: format!("{shape:?}"),
        });
    }
    if labels.len() != shape[0] {
        return Err(Error::ShapeMismatch {
            what: "batch labels",
            expected: format!("{} labels", shape[0]),
            got: format!("{} labels", labels.len()),
        });
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= model.num_classes()) {
        return Err(Error::ShapeMismatch {
            what: "batch labels",
            expected: format!("class index below {}", model.num_classes()),
            got: bad.to_string(),
        });
    }
    Ok(())
}
