//! Dataset collaborator seam
//!
//! A [`Dataset`] is a finite, restartable sequence of micro-batches. Every call
//! to [`Dataset::micro_batches`] starts a fresh pass in the same delivery order.

mod synthetic;

pub use synthetic::SyntheticBlobs;

use crate::error::{Error, Result};
use crate::model::Batch;
use ndarray::{s, Array2};

/// Restartable, ordered producer of micro-batches
pub trait Dataset {
    /// Start a new pass over the data
    fn micro_batches(&self) -> Box<dyn Iterator<Item = Batch> + '_>;

    /// Number of micro-batches in one pass
    fn len(&self) -> usize;

    /// Number of examples in one pass
    fn num_examples(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Examples held in memory, chunked into fixed-size micro-batches
///
/// The final micro-batch is short when the example count is not a multiple
/// of the batch size; nothing is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    inputs: Array2<f32>,
    labels: Vec<usize>,
    batch_size: usize,
}

impl InMemoryDataset {
    pub fn new(inputs: Array2<f32>, labels: Vec<usize>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::ConfigError(
                "dataset batch size must be > 0".to_string(),
            ));
        }
        if inputs.nrows() != labels.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![inputs.nrows()],
                got: vec![labels.len()],
            });
        }
        Ok(Self {
            inputs,
            labels,
            batch_size,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn features(&self) -> usize {
        self.inputs.ncols()
    }
}

impl Dataset for InMemoryDataset {
    fn micro_batches(&self) -> Box<dyn Iterator<Item = Batch> + '_> {
        let n = self.labels.len();
        Box::new((0..n).step_by(self.batch_size).map(move |start| {
            let end = (start + self.batch_size).min(n);
            Batch {
                inputs: self.inputs.slice(s![start..end, ..]).to_owned(),
                labels: self.labels[start..end].to_vec(),
            }
        }))
    }

    fn len(&self) -> usize {
        self.labels.len().div_ceil(self.batch_size)
    }

    fn num_examples(&self) -> usize {
        self.labels.len()
    }
}
