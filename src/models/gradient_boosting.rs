//! Gradient boosting for binary classification
//!
//! Logit boosting: shallow regression trees fit the gradient of the log-loss,
//! with shrinkage and row subsampling per round.

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};
use crate::models::decision_tree::DecisionTree;
use crate::models::{class_labels, encode_binary, Classifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows sampled per boosting round
    pub subsample: f64,
    trees: Vec<DecisionTree>,
    initial_score: f64,
    classes: Vec<f64>,
    seed: u64,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            subsample: 1.0,
            trees: Vec::new(),
            initial_score: 0.0,
            classes: Vec::new(),
            seed: 0,
        }
    }
}

impl GradientBoosting {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample.clamp(0.1, 1.0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn sigmoid(v: f64) -> f64 {
        1.0 / (1.0 + (-v).exp())
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut scores = Array1::from_elem(x.nrows(), self.initial_score);
        for tree in &self.trees {
            let update = tree.predict(x)?;
            scores = scores + update.mapv(|v| v * self.learning_rate);
        }
        Ok(scores)
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(NetGuardError::Shape {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }

        self.classes = class_labels(y);
        let codes = encode_binary(y, &self.classes)?;
        let n = x.nrows();

        // Prior log-odds
        let pos_rate = (codes.sum() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        self.initial_score = (pos_rate / (1.0 - pos_rate)).ln();

        let mut scores = Array1::from_elem(n, self.initial_score);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            // Negative gradient of log-loss
            let residuals = &codes - &scores.mapv(Self::sigmoid);

            let (fit_x, fit_r) = if self.subsample < 1.0 {
                let take = ((n as f64) * self.subsample).round().max(1.0) as usize;
                let mut idx: Vec<usize> = (0..n).collect();
                idx.shuffle(&mut rng);
                idx.truncate(take);
                let mut sx = Array2::zeros((take, x.ncols()));
                let mut sr = Array1::zeros(take);
                for (i, &src) in idx.iter().enumerate() {
                    sx.row_mut(i).assign(&x.row(src));
                    sr[i] = residuals[src];
                }
                (sx, sr)
            } else {
                (x.clone(), residuals.clone())
            };

            let mut tree = DecisionTree::new_regressor(self.max_depth);
            tree.fit(&fit_x, &fit_r)?;

            let update = tree.predict(x)?;
            scores = scores + update.mapv(|v| v * self.learning_rate);
            self.trees.push(tree);
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(NetGuardError::ModelNotFitted);
        }
        let negative = self.classes.first().copied().unwrap_or(0.0);
        let positive = self.classes.get(1).copied().unwrap_or(negative);
        let scores = self.raw_scores(x)?;
        Ok(scores.mapv(|s| if Self::sigmoid(s) > 0.5 { positive } else { negative }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_boosting_learns_split() {
        let x = array![[0.0], [0.5], [1.0], [9.0], [9.5], [10.0]];
        let y = array![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

        let mut gbm = GradientBoosting::default()
            .with_n_estimators(20)
            .with_seed(1);
        gbm.fit(&x, &y).unwrap();
        assert_eq!(gbm.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_subsample_stays_deterministic_under_seed() {
        let x = array![[0.0], [1.0], [2.0], [8.0], [9.0], [10.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut a = GradientBoosting::default()
            .with_n_estimators(10)
            .with_subsample(0.8)
            .with_seed(5);
        let mut b = a.clone();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_unfitted_errors() {
        let gbm = GradientBoosting::default();
        assert!(matches!(
            gbm.predict(&Array2::zeros((1, 1))),
            Err(NetGuardError::ModelNotFitted)
        ));
    }
}
