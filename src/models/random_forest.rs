//! Random forest: bootstrap-bagged decision trees with majority vote

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};
use crate::models::decision_tree::{Criterion, DecisionTree, MaxFeatures};
use crate::models::Classifier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    seed: u64,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: None,
            max_features: MaxFeatures::Sqrt,
            criterion: Criterion::Gini,
            seed: 0,
        }
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn bootstrap_sample(
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut ChaCha8Rng,
    ) -> (Array2<f64>, Array1<f64>) {
        let n = x.nrows();
        let mut bx = Array2::zeros((n, x.ncols()));
        let mut by = Array1::zeros(n);
        for i in 0..n {
            let pick = rng.gen_range(0..n);
            bx.row_mut(i).assign(&x.row(pick));
            by[i] = y[pick];
        }
        (bx, by)
    }

    fn majority(votes: &[f64]) -> f64 {
        let mut counts: Vec<(u64, usize)> = Vec::new();
        for &v in votes {
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

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(NetGuardError::Shape {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }

        // Deterministic per-tree seeds, tree fitting fans out over rayon
        let samples: Vec<(Array2<f64>, Array1<f64>, u64)> = (0..self.n_estimators)
            .map(|i| {
                let tree_seed = self.seed.wrapping_add(i as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);
                let (bx, by) = Self::bootstrap_sample(x, y, &mut rng);
                (bx, by, tree_seed)
            })
            .collect();

        let criterion = self.criterion;
        let max_features = self.max_features;
        let max_depth = self.max_depth;

        self.trees = samples
            .into_par_iter()
            .map(|(bx, by, tree_seed)| {
                let mut tree = DecisionTree::new()
                    .with_criterion(criterion)
                    .with_max_features(max_features)
                    .with_seed(tree_seed);
                if let Some(d) = max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree.fit(&bx, &by)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(NetGuardError::ModelNotFitted);
        }
        let per_tree: Vec<Array1<f64>> = self
            .trees
            .iter()
            .map(|t| t.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut out = Array1::zeros(x.nrows());
        let mut votes: Vec<f64> = Vec::with_capacity(self.trees.len());
        for i in 0..x.nrows() {
            votes.clear();
            votes.extend(per_tree.iter().map(|p| p[i]));
            out[i] = Self::majority(&votes);
        }
        Ok(out)
    }
}
