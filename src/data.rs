//! Batches and batch sources.
//!
//! A [`BatchSource`] yields a lazy, finite traversal of [`Batch`]es;
//! each call to [`BatchSource::batches`] begins a fresh traversal, which
//! is what makes an epoch restartable. The bundled [`InMemoryDataset`]
//! reshuffles on every traversal (better statistical properties than
//! shuffling once up front); pass a seed when the order must be
//! reproducible, or disable shuffling entirely.
//!
//! Dataset acquisition and decoding are outside this crate; callers hand
//! over flattened feature vectors and integer class labels.

use crate::error::{Error, Result};
use crate::tensors::{Ten64, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One group of examples processed in a single
/// forward/backward/update cycle.
///
/// `inputs` is `[n, input_dim]`, one flattened example per row;
/// `labels` holds one class index per row.
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Ten64,
    pub labels: Vec<usize>,
}

impl Batch {
    /// Creates a validated batch.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if `inputs` is not 2-D, the label count
    /// does not match the row count, or any label is not below
    /// `num_classes`.
    pub fn new(inputs: Ten64, labels: Vec<usize>, num_classes: usize) -> Result<Self> {
        if inputs.shape.len() != 2 || inputs.shape[0] != labels.len() {
            return Err(Error::ShapeMismatch {
                what: "batch inputs",
                expected: format!("[{}, d]", labels.len()),
                got: format!("{:?}", inputs.shape),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(Error::ShapeMismatch {
                what: "batch labels",
                expected: format!("class index below {num_classes}"),
                got: bad.to_string(),
            });
        }
        Ok(Self { inputs, labels })
    }

    /// Number of examples in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the batch holds no examples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A restartable producer of training batches.
///
/// Every call to [`BatchSource::batches`] starts a new full traversal of
/// the underlying data; one traversal is one epoch. The within-epoch
/// order is the implementation's choice. An implementation must yield at
/// least one batch per traversal.
pub trait BatchSource {
    /// Width of each flattened example.
    fn input_dim(&self) -> usize;

    /// Number of target classes the labels index into.
    fn num_classes(&self) -> usize;

    /// Begins a fresh traversal over the data.
    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_>;
}

/// A [`BatchSource`] over data held in memory, mini-batched and
/// shuffled anew on every epoch.
///
/// # Example
///
/// ```rust
/// use descent::data::{BatchSource, InMemoryDataset};
///
/// let mut data = InMemoryDataset::new(
///     vec![0.0, 0.0, 1.0, 1.0, 0.5, 0.5, 0.2, 0.8],
///     vec![0, 1, 0, 1],
///     2, // input_dim
///     2, // num_classes
///     2, // batch_size
/// )
/// .unwrap()
/// .with_seed(1);
/// assert_eq!(data.batches().count(), 2);
/// assert_eq!(data.batches().count(), 2); // restartable
/// ```
#[derive(Debug)]
pub struct InMemoryDataset {
    inputs: Vec<f64>,
    labels: Vec<usize>,
    input_dim: usize,
    num_classes: usize,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl InMemoryDataset {
    /// Creates a dataset from flattened row-major inputs and one label
    /// per example.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if the input length is not
    /// `labels.len() * input_dim`, the dataset is empty, any dimension
    /// is zero, or a label is not below `num_classes`.
    pub fn new(
        inputs: Vec<f64>,
        labels: Vec<usize>,
        input_dim: usize,
        num_classes: usize,
        batch_size: usize,
    ) -> Result<Self> {
        if input_dim == 0 || num_classes == 0 || batch_size == 0 || labels.is_empty() {
            return Err(Error::ShapeMismatch {
                what: "dataset dimensions",
                expected: "nonzero input_dim, num_classes, batch_size and examples".into(),
                got: format!(
                    "input_dim {input_dim}, num_classes {num_classes}, batch_size \
                     {batch_size}, {} examples",
                    labels.len()
                ),
            });
        }
        if inputs.len() != labels.len() * input_dim {
            return Err(Error::ShapeMismatch {
                what: "dataset inputs",
                expected: format!("{} values", labels.len() * input_dim),
                got: format!("{} values", inputs.len()),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(Error::ShapeMismatch {
                what: "dataset labels",
                expected: format!("class index below {num_classes}"),
                got: bad.to_string(),
            });
        }
        Ok(Self {
            inputs,
            labels,
            input_dim,
            num_classes,
            batch_size,
            shuffle: true,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Reseeds the shuffling RNG for reproducible epoch orders.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Enables or disables per-epoch shuffling (enabled by default).
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; construction rejects empty datasets.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn gather(&self, ids: &[usize]) -> Batch {
        let d = self.input_dim;
        let mut inputs = Vec::with_capacity(ids.len() * d);
        let mut labels = Vec::with_capacity(ids.len());
        for &i in ids {
            inputs.extend_from_slice(&self.inputs[i * d..(i + 1) * d]);
            labels.push(self.labels[i]);
        }
        Batch {
            inputs: Tensor::new(vec![ids.len(), d], inputs),
            labels,
        }
    }
}

impl BatchSource for InMemoryDataset {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_> {
        let mut order: Vec<usize> = (0..self.labels.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        // last batch may be short
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        Box::new(chunks.into_iter().map(move |ids| self.gather(&ids)))
    }
}
