//! Trains a classifier on noisy synthetic 8x8 glyphs.
//!
//! Stands in for the usual digit-recognition walkthrough without any
//! dataset download: each class is a fixed stroke pattern corrupted by
//! pixel noise.

use descent::data::InMemoryDataset;
use descent::loss::Loss;
use descent::metrics::accuracy;
use descent::model::{Activation, Classifier, GradMode};
use descent::optim::Sgd;
use descent::tensors::Tensor;
use descent::trainer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIDE: usize = 8;
const CLASSES: usize = 4;
const PER_CLASS: usize = 50;

/// One stroke pattern per class: left bar, top bar, diagonal, frame.
fn glyph(class: usize) -> Vec<f64> {
    let mut img = vec![0.0; SIDE * SIDE];
    for i in 0..SIDE {
        match class {
            0 => img[i * SIDE] = 1.0,
            1 => img[i] = 1.0,
            2 => img[i * SIDE + i] = 1.0,
            _ => {
                img[i] = 1.0;
                img[(SIDE - 1) * SIDE + i] = 1.0;
                img[i * SIDE] = 1.0;
                img[i * SIDE + SIDE - 1] = 1.0;
            }
        }
    }
    img
}

fn main() {
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(7);
    let mut inputs = Vec::with_capacity(CLASSES * PER_CLASS * SIDE * SIDE);
    let mut labels = Vec::with_capacity(CLASSES * PER_CLASS);
    for class in 0..CLASSES {
        let base = glyph(class);
        for _ in 0..PER_CLASS {
            inputs.extend(base.iter().map(|&p| {
                let noisy = p + (rng.random::<f64>() - 0.5) * 0.4;
                noisy.clamp(0.0, 1.0)
            }));
            labels.push(class);
        }
    }

    let mut data = InMemoryDataset::new(inputs.clone(), labels.clone(), SIDE * SIDE, CLASSES, 20)
        .expect("valid dataset")
        .with_seed(7);
    let mut model =
        Classifier::seeded(&[SIDE * SIDE, 32, CLASSES], Activation::Relu, 7).expect("valid model");
    let mut opt = Sgd::with_lr(0.1);

    trainer::run(&mut model, Loss::Nll, &mut opt, &mut data, 20).expect("training failed");

    let all = Tensor::new(vec![labels.len(), SIDE * SIDE], inputs);
    let fwd = model
        .forward(&all, GradMode::Frozen)
        .expect("inference failed");
    println!("Training accuracy: {}", accuracy(&fwd.output, &labels));
}
