//! AdaBoost over decision stumps

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};
use crate::models::{class_labels, encode_binary, Classifier};

/// One-feature threshold classifier emitting -1/+1
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_idx: usize,
    threshold: f64,
    /// +1.0 predicts positive above the threshold, -1.0 inverts
    polarity: f64,
}

impl Stump {
    fn predict_sample(&self, row: &[f64]) -> f64 {
        if row[self.feature_idx] > self.threshold {
            self.polarity
        } else {
            -self.polarity
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoost {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    classes: Vec<f64>,
}

impl Default for AdaBoost {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            stumps: Vec::new(),
            alphas: Vec::new(),
            classes: Vec::new(),
        }
    }
}

impl AdaBoost {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Find the weighted-error-minimizing stump.
    fn fit_stump(x: &Array2<f64>, signs: &Array1<f64>, weights: &Array1<f64>) -> (Stump, f64) {
        let n_samples = x.nrows();
        let mut best = Stump {
            feature_idx: 0,
            threshold: 0.0,
            polarity: 1.0,
        };
        let mut best_error = f64::MAX;

        for f in 0..x.ncols() {
            let mut vals: Vec<f64> = x.column(f).to_vec();
            vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            vals.dedup();

            for pair in vals.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                for polarity in [1.0, -1.0] {
                    let mut error = 0.0;
                    for i in 0..n_samples {
                        let pred = if x[[i, f]] > threshold { polarity } else { -polarity };
                        if (pred - signs[i]).abs() > 1e-10 {
                            error += weights[i];
                        }
                    }
                    if error < best_error {
                        best_error = error;
                        best = Stump {
                            feature_idx: f,
                            threshold,
                            polarity,
                        };
                    }
                }
            }
        }
        (best, best_error)
    }
}

impl Classifier for AdaBoost {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(NetGuardError::Shape {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }

        self.classes = class_labels(y);
        // Internal -1/+1 encoding
        let signs = encode_binary(y, &self.classes)?.mapv(|c| c * 2.0 - 1.0);

        let n = x.nrows();
        let mut weights = Array1::from_elem(n, 1.0 / n as f64);
        self.stumps.clear();
        self.alphas.clear();

        for _ in 0..self.n_estimators {
            let (stump, error) = Self::fit_stump(x, &signs, &weights);
            let error = error.clamp(1e-10, 1.0 - 1e-10);
            let alpha = self.learning_rate * 0.5 * ((1.0 - error) / error).ln();

            let mut row_buf: Vec<f64> = Vec::with_capacity(x.ncols());
            for i in 0..n {
                row_buf.clear();
                row_buf.extend(x.row(i).iter().copied());
                let pred = stump.predict_sample(&row_buf);
                weights[i] *= (-alpha * signs[i] * pred).exp();
            }
            let total = weights.sum();
            if total > 0.0 {
                weights.mapv_inplace(|w| w / total);
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);

            if error < 1e-9 {
                break;
            }
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stumps.is_empty() {
            return Err(NetGuardError::ModelNotFitted);
        }
        let negative = self.classes.first().copied().unwrap_or(0.0);
        let positive = self.classes.get(1).copied().unwrap_or(negative);

        let mut out = Array1::zeros(x.nrows());
        let mut row_buf: Vec<f64> = Vec::with_capacity(x.ncols());
        for (i, row) in x.rows().into_iter().enumerate() {
            row_buf.clear();
            row_buf.extend(row.iter().copied());
            let score: f64 = self
                .stumps
                .iter()
                .zip(self.alphas.iter())
                .map(|(s, a)| a * s.predict_sample(&row_buf))
                .sum();
            out[i] = if score > 0.0 { positive } else { negative };
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_adaboost_separable() {
        let x = array![[0.0, 1.0], [0.2, 0.8], [0.4, 1.2], [3.0, 0.1], [3.2, 0.3], [2.8, 0.2]];
        let y = array![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

        let mut model = AdaBoost::default().with_n_estimators(10);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_adaboost_zero_one_labels() {
        let x = array![[0.0], [0.5], [4.0], [4.5]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = AdaBoost::default().with_n_estimators(5);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_unfitted_errors() {
        let model = AdaBoost::default();
        assert!(matches!(
            model.predict(&Array2::zeros((1, 1))),
            Err(NetGuardError::ModelNotFitted)
        ));
    }
}
