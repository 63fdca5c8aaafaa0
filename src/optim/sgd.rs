//! Stochastic Gradient Descent optimizer

use super::Optimizer;
use crate::model::Param;
use ndarray::Array1;

/// SGD with heavy-ball momentum and L2 weight decay
///
/// ```text
/// g = grad + weight_decay * p
/// v = momentum * v + g        (v = g on the first update)
/// p = p - lr * v
/// ```
pub struct Sgd {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocities: Vec<Option<Array1<f32>>>,
}

impl Sgd {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            weight_decay: 0.0,
            velocities: Vec::new(),
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Initialize velocities if needed
    fn ensure_velocities(&mut self, params: &[Param]) {
        if self.velocities.len() != params.len() {
            self.velocities = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [Param]) {
        self.ensure_velocities(params);

        for (param, slot) in params.iter_mut().zip(self.velocities.iter_mut()) {
            let mut grad = param.grad().clone();
            if self.weight_decay != 0.0 {
                grad.scaled_add(self.weight_decay, param.data());
            }

            let update = if self.momentum > 0.0 {
                let velocity = match slot.take() {
                    Some(v) => v * self.momentum + &grad,
                    None => grad,
                };
                *slot = Some(velocity.clone());
                velocity
            } else {
                grad
            };

            param.data_mut().scaled_add(-self.lr, &update);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn momentum(&self) -> f32 {
        self.momentum
    }

    fn set_momentum(&mut self, momentum: f32) {
        self.momentum = momentum;
    }

    fn weight_decay(&self) -> f32 {
        self.weight_decay
    }

    fn name(&self) -> &str {
        "sgd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn param_with_grad(data: Array1<f32>, grad: Array1<f32>) -> Param {
        let mut p = Param::new(data);
        p.accumulate_grad(&grad).unwrap();
        p
    }

    #[test]
    fn test_plain_step() {
        let mut params = vec![param_with_grad(array![1.0, 2.0], array![0.5, -1.0])];
        let mut opt = Sgd::new(0.1, 0.0);
        opt.step(&mut params);

        assert_abs_diff_eq!(params[0].data()[0], 0.95, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].data()[1], 2.1, epsilon = 1e-6);
    }

    #[test]
    fn test_momentum_accumulates_velocity() {
        let mut params = vec![param_with_grad(array![0.0], array![1.0])];
        let mut opt = Sgd::new(1.0, 0.9);

        // v1 = g = 1, p = -1
        opt.step(&mut params);
        assert_abs_diff_eq!(params[0].data()[0], -1.0, epsilon = 1e-6);

        // v2 = 0.9 * 1 + 1 = 1.9, p = -2.9
        opt.step(&mut params);
        assert_abs_diff_eq!(params[0].data()[0], -2.9, epsilon = 1e-6);
    }

    #[test]
    fn test_weight_decay_pulls_toward_zero() {
        let mut params = vec![Param::new(array![2.0])];
        let mut opt = Sgd::new(0.5, 0.0).with_weight_decay(0.1);
        opt.step(&mut params);

        // g = 0 + 0.1 * 2 = 0.2, p = 2 - 0.5 * 0.2
        assert_abs_diff_eq!(params[0].data()[0], 1.9, epsilon = 1e-6);
    }

    #[test]
    fn test_set_lr_and_momentum() {
        let mut opt = Sgd::new(1.0, 0.0);
        opt.set_lr(0.004);
        opt.set_momentum(0.95);
        assert_eq!(opt.lr(), 0.004);
        assert_eq!(opt.momentum(), 0.95);
    }

    #[test]
    fn test_zero_grad_default_impl() {
        let mut params = vec![param_with_grad(array![1.0], array![3.0])];
        let mut opt = Sgd::new(0.1, 0.0);
        opt.zero_grad(&mut params);
        assert_eq!(params[0].grad()[0], 0.0);
    }
}
