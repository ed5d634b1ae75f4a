use approx::assert_relative_eq;
use descent::data::{Batch, BatchSource, InMemoryDataset};
use descent::loss::{one_hot, Loss};
use descent::metrics::accuracy;
use descent::model::{Activation, Classifier, Dense, GradMode};
use descent::optim::Sgd;
use descent::tensor;
use descent::tensors::Ten64;
use descent::{trainer, Error};

fn fixed_two_layer() -> Classifier {
    // positive first layer so ReLU passes everything through, zero second
    // layer so the initial class scores are exactly symmetric
    let l1 = Dense::from_parts(
        tensor!([[1.0, 0.5, 0.25, 0.75], [0.5, 1.0, 0.75, 0.25]]),
        Ten64::zeros(vec![4]),
    );
    let l2 = Dense::from_parts(Ten64::zeros(vec![4, 2]), Ten64::zeros(vec![2]));
    Classifier::from_layers(vec![l1, l2], Activation::Relu).unwrap()
}

fn two_point_batch() -> Batch {
    Batch::new(tensor!([[1.0, 0.0], [0.0, 1.0]]), vec![0, 1], 2).unwrap()
}

#[test]
fn test_forward_is_deterministic() {
    let model = Classifier::seeded(&[2, 5, 3], Activation::Relu, 11).unwrap();
    let inputs = tensor!([[0.2, -0.4], [1.0, 0.5]]);
    let a = model.forward(&inputs, GradMode::Frozen).unwrap();
    let b = model.forward(&inputs, GradMode::Frozen).unwrap();
    assert_eq!(a.output.data, b.output.data);
}

#[test]
fn test_gradients_absent_until_backward_runs() {
    let mut model = Classifier::seeded(&[2, 3, 2], Activation::Relu, 4).unwrap();
    assert!(model.layers()[0].weight.grad().is_none());

    let batch = two_point_batch();
    let fwd = model.forward(&batch.inputs, GradMode::Tracked).unwrap();
    let (_, grad) = Loss::Nll.evaluate(&fwd.output, &batch.labels);
    model.backward(fwd.tape().unwrap(), &grad);
    assert!(model.layers()[0].weight.grad().is_some());
}

#[test]
fn test_frozen_forward_has_no_tape() {
    let model = Classifier::seeded(&[2, 3, 2], Activation::Relu, 4).unwrap();
    let fwd = model
        .forward(&tensor!([[0.0, 1.0]]), GradMode::Frozen)
        .unwrap();
    assert!(matches!(fwd.tape(), Err(Error::NoGradient { .. })));
}

#[test]
fn test_gradient_isolation_after_clear() {
    let mut model = Classifier::seeded(&[2, 3, 2], Activation::Sigmoid, 9).unwrap();
    let batch_a = two_point_batch();
    let batch_b = Batch::new(tensor!([[0.5, 0.5]]), vec![1], 2).unwrap();

    let backward = |model: &mut Classifier, batch: &Batch| {
        let fwd = model.forward(&batch.inputs, GradMode::Tracked).unwrap();
        let (_, grad) = Loss::Nll.evaluate(&fwd.output, &batch.labels);
        model.backward(fwd.tape().unwrap(), &grad);
    };

    backward(&mut model, &batch_a);
    let isolated = model.layers()[0].weight.grad().unwrap().clone();

    // a pass over unrelated data, then a clear, must leave no trace
    model.zero_grad();
    backward(&mut model, &batch_b);
    model.zero_grad();
    backward(&mut model, &batch_a);

    assert_eq!(model.layers()[0].weight.grad().unwrap().data, isolated.data);
}

#[test]
fn test_two_batch_descent_matches_hand_computed_loss() {
    // With symmetric initial scores every example has log-probability
    // -ln 2 for both classes, so the first batch's loss is exactly ln 2.
    let mut model = fixed_two_layer();
    let mut data = InMemoryDataset::new(
        vec![1.0, 0.0, 0.0, 1.0],
        vec![0, 1],
        2,
        2,
        2,
    )
    .unwrap()
    .with_shuffle(false);
    let mut opt = Sgd::with_lr(0.003);

    let losses = trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 2).unwrap();
    assert_eq!(losses.len(), 2);
    assert_relative_eq!(losses[0], 2.0_f64.ln(), epsilon = 1e-12);
    assert!(losses[1] < losses[0]);
}

#[test]
fn test_training_reduces_loss_on_separable_data() {
    let mut model = Classifier::seeded(&[2, 8, 2], Activation::Sigmoid, 17).unwrap();
    let mut data = InMemoryDataset::new(
        vec![
            0.0, 0.0, 0.1, 0.0, 0.0, 0.1, // class 0 cluster
            1.0, 1.0, 0.9, 1.0, 1.0, 0.9, // class 1 cluster
        ],
        vec![0, 0, 0, 1, 1, 1],
        2,
        2,
        3,
    )
    .unwrap()
    .with_seed(17);
    let mut opt = Sgd::with_lr(0.3);

    let losses = trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 50).unwrap();
    assert!(losses.iter().all(|l| l.is_finite()));
    assert!(losses.last().unwrap() < losses.first().unwrap());
}

#[test]
fn test_mse_loss_path_trains() {
    let mut model = Classifier::seeded(&[2, 4, 2], Activation::Relu, 23).unwrap();
    let mut data = InMemoryDataset::new(
        vec![0.0, 0.0, 1.0, 1.0],
        vec![0, 1],
        2,
        2,
        2,
    )
    .unwrap()
    .with_seed(23);
    let mut opt = Sgd::with_lr(0.1);

    let losses = trainer::run(&mut model, Loss::Mse, &mut opt, &mut data, 3).unwrap();
    assert!(losses.iter().all(|l| l.is_finite() && *l >= 0.0));
}

#[test]
fn test_restartable_source_yields_same_batch_count_each_epoch() {
    let mut data = InMemoryDataset::new(
        vec![0.0; 10],
        vec![0, 1, 0, 1, 0],
        2,
        2,
        2,
    )
    .unwrap()
    .with_seed(3);

    let first: Vec<usize> = data.batches().map(|b| b.len()).collect();
    let second: Vec<usize> = data.batches().map(|b| b.len()).collect();
    assert_eq!(first.len(), 3); // 2 + 2 + 1
    assert_eq!(first.len(), second.len());
    assert_eq!(first.iter().sum::<usize>(), 5);
    assert_eq!(second.iter().sum::<usize>(), 5);
}

#[test]
fn test_zero_epochs_is_rejected_before_any_work() {
    let mut model = Classifier::seeded(&[2, 2], Activation::Relu, 1).unwrap();
    let mut data =
        InMemoryDataset::new(vec![0.0, 0.0], vec![0], 2, 2, 1).unwrap();
    let mut opt = Sgd::with_lr(0.1);

    let err = trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 0).unwrap_err();
    assert_eq!(err, Error::InvalidEpochCount { epochs: 0 });
}

#[test]
fn test_source_width_mismatch_is_rejected() {
    let mut model = Classifier::seeded(&[2, 2], Activation::Relu, 1).unwrap();
    let mut data =
        InMemoryDataset::new(vec![0.0, 0.0, 0.0], vec![0], 3, 2, 1).unwrap();
    let mut opt = Sgd::with_lr(0.1);

    let err = trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 1).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn test_out_of_range_labels_are_rejected() {
    let err = InMemoryDataset::new(vec![0.0, 0.0], vec![5], 2, 2, 1).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

/// A source whose declared widths are fine but whose batches are not.
struct LyingSource {
    served: bool,
}

impl BatchSource for LyingSource {
    fn input_dim(&self) -> usize {
        2
    }

    fn num_classes(&self) -> usize {
        2
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_> {
        self.served = true;
        let bad = Batch {
            inputs: tensor!([[1.0, 2.0, 3.0]]),
            labels: vec![0],
        };
        Box::new(std::iter::once(bad))
    }
}

#[test]
fn test_trainer_revalidates_batches_from_foreign_sources() {
    let mut model = Classifier::seeded(&[2, 2], Activation::Relu, 1).unwrap();
    let mut source = LyingSource { served: false };
    let mut opt = Sgd::with_lr(0.1);

    let err = trainer::run(&mut model, Loss::Nll, &mut opt, &mut source, 1).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
    assert!(source.served);
}

#[test]
fn test_one_hot_encoding() {
    let targets = one_hot(&[1, 0], 2);
    assert_eq!(targets.shape, vec![2, 2]);
    assert_eq!(targets.data, vec![0.0, 1.0, 1.0, 0.0]);
}

#[test]
fn test_accuracy_metric() {
    let logp = tensor!([[-0.1, -3.0], [-2.5, -0.2]]);
    assert_relative_eq!(accuracy(&logp, &[0, 1]), 1.0);
    assert_relative_eq!(accuracy(&logp, &[1, 0]), 0.0);
    assert_relative_eq!(accuracy(&logp, &[0, 0]), 0.5);
}

#[test]
fn test_predict_classes_picks_highest_score() {
    let layer = Dense::from_parts(tensor!([[5.0, 0.0], [0.0, 5.0]]), Ten64::zeros(vec![2]));
    let model = Classifier::from_layers(vec![layer], Activation::Relu).unwrap();
    let classes = model
        .predict_classes(&tensor!([[1.0, 0.0], [0.0, 1.0]]))
        .unwrap();
    assert_eq!(classes, vec![0, 1]);
}
