//! CART decision tree
//!
//! Classification with gini/entropy impurity; a mean-squared-error mode backs
//! the regression trees gradient boosting fits on residuals.

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};
use crate::models::Classifier;

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    Gini,
    Entropy,
    /// Variance reduction; turns the tree into a regressor
    Mse,
}

/// How many features each split considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    fn count(&self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().round() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().round() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    seed: u64,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::All,
            criterion: Criterion::Gini,
            seed: 0,
            n_features: 0,
        }
    }

    /// Regression tree used by gradient boosting.
    pub fn new_regressor(max_depth: usize) -> Self {
        Self {
            criterion: Criterion::Mse,
            max_depth: Some(max_depth),
            ..Self::new()
        }
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn impurity(&self, y: &[f64]) -> f64 {
        let n = y.len() as f64;
        if n == 0.0 {
            return 0.0;
        }
        match self.criterion {
            Criterion::Mse => {
                let mean = y.iter().sum::<f64>() / n;
                y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
            }
            Criterion::Gini | Criterion::Entropy => {
                let mut counts: Vec<(u64, usize)> = Vec::new();
                for &v in y {
                    let key = v.to_bits();
                    match counts.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, c)) => *c += 1,
                        None => counts.push((key, 1)),
                    }
                }
                if self.criterion == Criterion::Gini {
                    1.0 - counts
                        .iter()
                        .map(|(_, c)| (*c as f64 / n).powi(2))
                        .sum::<f64>()
                } else {
                    -counts
                        .iter()
                        .map(|(_, c)| {
                            let p = *c as f64 / n;
                            p * p.log2()
                        })
                        .sum::<f64>()
                }
            }
        }
    }

    fn leaf_value(&self, y: &[f64]) -> f64 {
        let n = y.len() as f64;
        match self.criterion {
            Criterion::Mse => y.iter().sum::<f64>() / n.max(1.0),
            _ => {
                // Majority label
                let mut counts: Vec<(u64, usize)> = Vec::new();
                for &v in y {
                    let key = v.to_bits();
                    match counts.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, c)) => *c += 1,
                        None => counts.push((key, 1)),
                    }
                }
                counts
                    .iter()
                    .max_by_key(|(_, c)| *c)
                    .map(|(k, _)| f64::from_bits(*k))
                    .unwrap_or(0.0)
            }
        }
    }

    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let parent_vals: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&parent_vals);
        let n = indices.len() as f64;

        let mut best: Option<(usize, f64, f64)> = None;

        for &f in features {
            let mut vals: Vec<f64> = indices.iter().map(|&i| x[[i, f]]).collect();
            vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            vals.dedup();

            for pair in vals.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let (mut left, mut right) = (Vec::new(), Vec::new());
                for &i in indices {
                    if x[[i, f]] <= threshold {
                        left.push(y[i]);
                    } else {
                        right.push(y[i]);
                    }
                }
                if left.is_empty() || right.is_empty() {
                    continue;
                }
                let weighted = (left.len() as f64 / n) * self.impurity(&left)
                    + (right.len() as f64 / n) * self.impurity(&right);
                let gain = parent_impurity - weighted;
                if gain > best.map(|(_, _, g)| g).unwrap_or(1e-12) {
                    best = Some((f, threshold, gain));
                }
            }
        }
        best
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let vals: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let depth_reached = self.max_depth.map(|d| depth >= d).unwrap_or(false);
        let pure = self.impurity(&vals) < 1e-12;
        if depth_reached || pure || indices.len() < self.min_samples_split {
            return TreeNode::Leaf {
                value: self.leaf_value(&vals),
            };
        }

        let n_features = x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        let k = self.max_features.count(n_features);
        if k < n_features {
            features.shuffle(rng);
            features.truncate(k);
        }

        match self.best_split(x, y, indices, &features) {
            Some((feature_idx, threshold, _)) => {
                let (mut left_idx, mut right_idx) = (Vec::new(), Vec::new());
                for &i in indices {
                    if x[[i, feature_idx]] <= threshold {
                        left_idx.push(i);
                    } else {
                        right_idx.push(i);
                    }
                }
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left: Box::new(self.build(x, y, &left_idx, depth + 1, rng)),
                    right: Box::new(self.build(x, y, &right_idx, depth + 1, rng)),
                }
            }
            None => TreeNode::Leaf {
                value: self.leaf_value(&vals),
            },
        }
    }

    fn predict_row(node: &TreeNode, row: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_row(left, row)
                } else {
                    Self::predict_row(right, row)
                }
            }
        }
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(NetGuardError::Shape {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(NetGuardError::Data("empty training set".to_string()));
        }
        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.root = Some(self.build(x, y, &indices, 0, &mut rng));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(NetGuardError::ModelNotFitted)?;
        let mut out = Array1::zeros(x.nrows());
        let mut row_buf: Vec<f64> = Vec::with_capacity(x.ncols());
        for (i, row) in x.rows().into_iter().enumerate() {
            row_buf.clear();
            row_buf.extend(row.iter().copied());
            out[i] = Self::predict_row(root, &row_buf);
        }
        Ok(out)
    }
}
