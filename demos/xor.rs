use descent::data::InMemoryDataset;
use descent::loss::Loss;
use descent::metrics::accuracy;
use descent::model::{Activation, Classifier, GradMode};
use descent::optim::Sgd;
use descent::tensor;
use descent::trainer;

fn main() {
    env_logger::init();

    let inputs = vec![
        0.0, 0.0, //
        0.0, 1.0, //
        1.0, 0.0, //
        1.0, 1.0,
    ];
    let labels = vec![0, 1, 1, 0];

    let mut data = InMemoryDataset::new(inputs, labels.clone(), 2, 2, 4)
        .expect("valid dataset")
        .with_seed(42);
    let mut model = Classifier::seeded(&[2, 8, 2], Activation::Sigmoid, 42).expect("valid model");
    let mut opt = Sgd::with_lr(0.5);

    trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 200).expect("training failed");

    let grid = tensor!([[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
    let fwd = model
        .forward(&grid, GradMode::Frozen)
        .expect("inference failed");
    println!("Accuracy: {}", accuracy(&fwd.output, &labels));
    for (row, pred) in grid
        .data
        .chunks(2)
        .zip(model.predict_classes(&grid).expect("inference failed"))
    {
        println!("{row:?} -> class {pred}");
    }
}
