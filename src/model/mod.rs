//! Model collaborator seam
//!
//! The training core treats the network as an opaque differentiable function:
//! `forward` produces logits and caches whatever `backward` needs, `backward`
//! accumulates parameter gradients, and `infer` evaluates without touching
//! gradient state. [`SoftmaxClassifier`] is a small concrete implementation
//! used to drive the core end to end.

mod linear;

pub use linear::SoftmaxClassifier;

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};

/// Flattened parameter with its gradient buffer
///
/// Gradients accumulate across `accumulate_grad` calls until `zero_grad`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    data: Array1<f32>,
    grad: Array1<f32>,
}

impl Param {
    /// Wrap parameter values with a zeroed gradient
    pub fn new(data: Array1<f32>) -> Self {
        let grad = Array1::zeros(data.len());
        Self { data, grad }
    }

    /// Zero-initialized parameter of length `len`
    pub fn zeros(len: usize) -> Self {
        Self::new(Array1::zeros(len))
    }

    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    pub fn grad(&self) -> &Array1<f32> {
        &self.grad
    }

    /// Add `grad` into the gradient buffer
    pub fn accumulate_grad(&mut self, grad: &Array1<f32>) -> Result<()> {
        if grad.len() != self.grad.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.grad.len()],
                got: vec![grad.len()],
            });
        }
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(Error::InvalidGradient(
                "non-finite value in accumulated gradient".to_string(),
            ));
        }
        self.grad += grad;
        Ok(())
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One micro-batch: a row per example plus its class label
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Array2<f32>,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn new(inputs: Array2<f32>, labels: Vec<usize>) -> Result<Self> {
        if inputs.nrows() != labels.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![inputs.nrows()],
                got: vec![labels.len()],
            });
        }
        Ok(Self { inputs, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Differentiable classifier driven by the training core
pub trait Model {
    /// Compute logits (one row per example) and cache activations for `backward`
    fn forward(&mut self, inputs: &Array2<f32>) -> Result<Array2<f32>>;

    /// Accumulate parameter gradients given d(loss)/d(logits)
    fn backward(&mut self, logit_grad: &Array2<f32>) -> Result<()>;

    /// Compute logits without caching anything (no-gradient mode)
    fn infer(&self, inputs: &Array2<f32>) -> Result<Array2<f32>>;

    fn params(&self) -> &[Param];

    fn params_mut(&mut self) -> &mut [Param];
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_param_accumulates_until_zeroed() {
        let mut p = Param::zeros(3);
        p.accumulate_grad(&array![1.0, 2.0, 3.0]).unwrap();
        p.accumulate_grad(&array![1.0, 1.0, 1.0]).unwrap();
        assert_eq!(p.grad(), &array![2.0, 3.0, 4.0]);

        p.zero_grad();
        assert_eq!(p.grad(), &array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_param_rejects_wrong_length() {
        let mut p = Param::zeros(2);
        let err = p.accumulate_grad(&array![1.0]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_param_rejects_non_finite_gradient() {
        let mut p = Param::zeros(2);
        let err = p.accumulate_grad(&array![f32::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidGradient(_)));
        assert_eq!(p.grad(), &array![0.0, 0.0]);
    }

    #[test]
    fn test_batch_label_count_must_match_rows() {
        let inputs = Array2::zeros((3, 2));
        assert!(Batch::new(inputs.clone(), vec![0, 1, 2]).is_ok());
        assert!(matches!(
            Batch::new(inputs, vec![0]).unwrap_err(),
            Error::ShapeMismatch { .. }
        ));
    }
}
