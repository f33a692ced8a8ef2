//! Logistic regression via gradient descent with L2 regularization

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};
use crate::models::{class_labels, encode_binary, Classifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub learning_rate: f64,
    classes: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            classes: Vec::new(),
        }
    }
}

impl LogisticRegression {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(NetGuardError::Shape {
                expected: format!("{n_samples} targets"),
                actual: format!("{} targets", y.len()),
            });
        }

        self.classes = class_labels(y);
        let codes = encode_binary(y, &self.classes)?;

        let mut weights: Array1<f64> = Array1::zeros(n_features);
        let mut bias = 0.0f64;
        let n = n_samples as f64;

        for _ in 0..self.max_iter {
            let z = x.dot(&weights) + bias;
            let probs = Self::sigmoid(&z);
            let errors = &probs - &codes;

            let grad_w = x.t().dot(&errors) / n + &weights * self.alpha;
            let grad_b = errors.sum() / n;

            let step_w = grad_w.mapv(|g| g * self.learning_rate);
            let step_b = grad_b * self.learning_rate;

            weights = &weights - &step_w;
            bias -= step_b;

            let step_norm = step_w.mapv(f64::abs).sum() + step_b.abs();
            if step_norm < self.tol {
                break;
            }
        }

        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self
            .coefficients
            .as_ref()
            .ok_or(NetGuardError::ModelNotFitted)?;
        let negative = self.classes.first().copied().unwrap_or(0.0);
        let positive = self.classes.get(1).copied().unwrap_or(negative);

        let z = x.dot(weights) + self.intercept;
        let probs = Self::sigmoid(&z);
        Ok(probs.mapv(|p| if p > 0.5 { positive } else { negative }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logistic_separable() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = array![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_unfitted_errors() {
        let model = LogisticRegression::default();
        assert!(matches!(
            model.predict(&Array2::zeros((1, 1))),
            Err(NetGuardError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 1.0, 1.0];
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();
        // Only one class was observed; predictions stay within it
        for v in model.predict(&x).unwrap().iter() {
            assert_eq!(*v, 1.0);
        }
    }
}
