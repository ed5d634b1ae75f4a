//! The feed-forward classifier.
//!
//! A [`Classifier`] is an ordered stack of dense layers with an
//! activation between them, ending in a log-softmax over class scores.
//! It owns every parameter it declares; the only mutation paths are
//! gradient accumulation during [`Classifier::backward`] and the
//! optimizer's update step.
//!
//! Gradient tracking is an explicit per-call choice ([`GradMode`]) rather
//! than ambient global state, so inference passes and concurrent tests
//! cannot contaminate each other. A tracked forward pass records the
//! backward closures of every operation it ran on a [`Tape`]; a frozen
//! pass records nothing, and asking it for a tape is a
//! [`Error::NoGradient`].

use crate::backprop;
use crate::error::{Error, Result};
use crate::ops::{GradFn, GradPairFn};
use crate::tensors::{Ten64, Tensor, WithGrad};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Elementwise nonlinearity applied between dense layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, z: &Ten64) -> (Ten64, Box<GradFn>) {
        match self {
            Self::Relu => backprop::relu(z),
            Self::Sigmoid => backprop::sigmoid(z),
        }
    }
}

/// Whether a forward pass records backward closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradMode {
    /// Record a [`Tape`] so the pass can be differentiated.
    Tracked,
    /// Inference only; no tape is recorded.
    Frozen,
}

/// One affine layer: `z = x . weight + bias`.
///
/// `weight` has shape `[in_dim, out_dim]`, `bias` has shape `[out_dim]`.
#[derive(Debug, Clone)]
pub struct Dense {
    pub weight: WithGrad<Ten64>,
    pub bias: WithGrad<Ten64>,
}

impl Dense {
    /// Creates a layer with weights drawn uniformly from
    /// `[-1/sqrt(in_dim), 1/sqrt(in_dim)]` and a zero bias.
    pub fn random(in_dim: usize, out_dim: usize, rng: &mut impl Rng) -> Self {
        let scale = 1.0 / (in_dim as f64).sqrt();
        let weight = (0..in_dim * out_dim)
            .map(|_| (rng.random::<f64>() * 2.0 - 1.0) * scale)
            .collect();
        Self {
            weight: WithGrad::new(Tensor::new(vec![in_dim, out_dim], weight)),
            bias: WithGrad::new(Ten64::zeros(vec![out_dim])),
        }
    }

    /// Creates a layer from explicit parameter tensors.
    ///
    /// # Panics
    /// Panics if `weight` is not 2-D or `bias` is not a vector of the
    /// weight's output width.
    pub fn from_parts(weight: Ten64, bias: Ten64) -> Self {
        assert_eq!(weight.shape.len(), 2, "dense weight must be 2-D");
        assert_eq!(
            bias.shape,
            vec![weight.shape[1]],
            "bias width must match weight output width"
        );
        Self {
            weight: WithGrad::new(weight),
            bias: WithGrad::new(bias),
        }
    }

    /// Input width of the layer.
    pub fn in_dim(&self) -> usize {
        self.weight.value.shape[0]
    }

    /// Output width of the layer.
    pub fn out_dim(&self) -> usize {
        self.weight.value.shape[1]
    }
}

struct LayerTape {
    mat: Box<GradPairFn>,
    bias: Box<GradPairFn>,
    act: Option<Box<GradFn>>,
}

/// Backward closures recorded by one tracked forward pass.
///
/// A tape is only meaningful for the model state and batch that produced
/// it; replaying it after the parameters changed computes gradients of
/// the old graph.
pub struct Tape {
    layers: Vec<LayerTape>,
    out: Box<GradFn>,
}

/// Result of [`Classifier::forward`]: log-probabilities plus, for
/// tracked passes, the recorded tape.
pub struct Forward {
    /// Log-probabilities, one row per example, one column per class.
    pub output: Ten64,
    tape: Option<Tape>,
}

impl Forward {
    /// The recorded tape.
    ///
    /// # Errors
    /// [`Error::NoGradient`] if the pass ran with [`GradMode::Frozen`].
    pub fn tape(&self) -> Result<&Tape> {
        self.tape.as_ref().ok_or(Error::NoGradient {
            what: "backward pass (forward ran without gradient tracking)",
        })
    }
}

/// A feed-forward classifier: dense layers, an activation between them,
/// log-softmax at the end.
///
/// The output width of the final layer is the number of target classes.
///
/// # Example
///
/// ```rust
/// use descent::model::{Activation, Classifier, GradMode};
/// use descent::tensor;
///
/// let model = Classifier::seeded(&[2, 4, 2], Activation::Relu, 7).unwrap();
/// let fwd = model
///     .forward(&tensor!([[0.0, 1.0]]), GradMode::Frozen)
///     .unwrap();
/// assert_eq!(fwd.output.shape, vec![1, 2]);
/// assert!(fwd.tape().is_err());
/// ```
pub struct Classifier {
    layers: Vec<Dense>,
    activation: Activation,
}

impl Classifier {
    /// Creates a classifier with randomly initialized layers.
    ///
    /// `dims` lists the layer widths from input to output, so
    /// `&[784, 128, 10]` is a two-layer network for 10 classes.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if fewer than two widths are given or
    /// any width is zero.
    pub fn new(dims: &[usize], activation: Activation) -> Result<Self> {
        let mut rng = rand::rng();
        Self::with_rng(dims, activation, &mut rng)
    }

    /// Like [`Classifier::new`] but deterministic for a given seed.
    pub fn seeded(dims: &[usize], activation: Activation, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(dims, activation, &mut rng)
    }

    fn with_rng(dims: &[usize], activation: Activation, rng: &mut impl Rng) -> Result<Self> {
        if dims.len() < 2 || dims.contains(&0) {
            return Err(Error::ShapeMismatch {
                what: "layer widths",
                expected: "at least two nonzero widths".into(),
                got: format!("{dims:?}"),
            });
        }
        let layers = dims
            .windows(2)
            .map(|w| Dense::random(w[0], w[1], rng))
            .collect();
        Ok(Self { layers, activation })
    }

    /// Creates a classifier from explicit layers.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if no layers are given or consecutive
    /// layer widths do not chain.
    pub fn from_layers(layers: Vec<Dense>, activation: Activation) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::ShapeMismatch {
                what: "layers",
                expected: "at least one dense layer".into(),
                got: "0 layers".into(),
            });
        }
        for pair in layers.windows(2) {
            if pair[0].out_dim() != pair[1].in_dim() {
                return Err(Error::ShapeMismatch {
                    what: "layer chain",
                    expected: format!("in_dim {}", pair[0].out_dim()),
                    got: format!("in_dim {}", pair[1].in_dim()),
                });
            }
        }
        Ok(Self { layers, activation })
    }

    /// Declared input width.
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    /// Number of target classes (output width of the final layer).
    pub fn num_classes(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim()
    }

    /// The layer stack, in forward order.
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Every parameter of the model, in a stable order.
    pub fn params_mut(&mut self) -> Vec<&mut WithGrad<Ten64>> {
        self.layers
            .iter_mut()
            .flat_map(|l| [&mut l.weight, &mut l.bias])
            .collect()
    }

    /// Clears every parameter's gradient accumulator to absent.
    pub fn zero_grad(&mut self) {
        for layer in &mut self.layers {
            layer.weight.clear_grad();
            layer.bias.clear_grad();
        }
    }

    /// Runs the forward pass over a batch of inputs (one flattened
    /// example per row), producing log-probabilities.
    ///
    /// Reading the model twice with identical inputs and unchanged
    /// parameters yields identical output; forward mutates nothing.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if `inputs` is not `[n, input_dim]`.
    pub fn forward(&self, inputs: &Ten64, mode: GradMode) -> Result<Forward> {
        if inputs.shape.len() != 2 || inputs.shape[1] != self.input_dim() {
            return Err(Error::ShapeMismatch {
                what: "batch inputs",
                expected: format!("[n, {}]", self.input_dim()),
                got: format!("{:?}", inputs.shape),
            });
        }

        let tracked = mode == GradMode::Tracked;
        let last = self.layers.len() - 1;
        let mut steps = Vec::with_capacity(if tracked { self.layers.len() } else { 0 });
        let mut x = inputs.clone();

        for (i, layer) in self.layers.iter().enumerate() {
            let (z, back_mat) = backprop::matmul(&x, &layer.weight.value);
            let (zb, back_bias) = backprop::add_bias(&z, &layer.bias.value);
            let (a, back_act) = if i < last {
                let (a, back) = self.activation.apply(&zb);
                (a, Some(back))
            } else {
                (zb, None)
            };
            if tracked {
                steps.push(LayerTape {
                    mat: back_mat,
                    bias: back_bias,
                    act: back_act,
                });
            }
            x = a;
        }

        let (output, back_out) = backprop::log_softmax(&x);
        let tape = tracked.then_some(Tape {
            layers: steps,
            out: back_out,
        });
        Ok(Forward { output, tape })
    }

    /// Runs the backward pass for a tape recorded by this model's most
    /// recent tracked forward, summing `dloss/dparam` into every
    /// parameter's accumulator.
    ///
    /// `grad_output` is the loss gradient with respect to the forward
    /// pass's log-probabilities.
    ///
    /// # Panics
    /// Panics if the tape was recorded by a differently shaped model or
    /// batch.
    pub fn backward(&mut self, tape: &Tape, grad_output: &Ten64) {
        let mut g = (tape.out)(grad_output);
        for (layer, step) in self.layers.iter_mut().zip(&tape.layers).rev() {
            if let Some(back_act) = &step.act {
                g = back_act(&g);
            }
            let (dz, db) = (step.bias)(&g);
            let (dx, dw) = (step.mat)(&dz);
            layer.weight.accumulate(&dw);
            layer.bias.accumulate(&db);
            g = dx;
        }
    }

    /// Predicts the most likely class per example with a frozen forward
    /// pass.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if `inputs` is not `[n, input_dim]`.
    pub fn predict_classes(&self, inputs: &Ten64) -> Result<Vec<usize>> {
        let fwd = self.forward(inputs, GradMode::Frozen)?;
        let c = self.num_classes();
        let classes = fwd
            .output
            .data
            .chunks(c)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(j, _)| j)
                    .unwrap_or(0)
            })
            .collect();
        Ok(classes)
    }
}
