//! Randomized hyperparameter search with K-fold cross-validation

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NetGuardError, Result};
use crate::models::{Classifier, ModelFamily};

/// One hyperparameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&'static str> for ParamValue {
    fn from(v: &'static str) -> Self {
        ParamValue::Str(v)
    }
}

/// Declared search space of one family: candidate values per parameter.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    entries: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.entries.push((name.to_string(), values));
        self
    }

    /// Empty grid means default parameters only.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw one parameter set uniformly per parameter.
    fn sample(&self, rng: &mut ChaCha8Rng) -> ParamSet {
        let mut set = HashMap::with_capacity(self.entries.len());
        for (name, values) in &self.entries {
            if !values.is_empty() {
                let pick = rng.gen_range(0..values.len());
                set.insert(name.clone(), values[pick]);
            }
        }
        ParamSet(set)
    }
}

/// One sampled assignment of hyperparameters
#[derive(Debug, Clone, Default)]
pub struct ParamSet(HashMap<String, ParamValue>);

impl ParamSet {
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.0.get(name) {
            Some(ParamValue::Float(v)) => Some(*v),
            Some(ParamValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&'static str> {
        match self.0.get(name) {
            Some(ParamValue::Str(v)) => Some(v),
            _ => None,
        }
    }
}

/// Shuffled K-fold partition of `0..n_samples`.
pub fn k_fold_indices(
    n_samples: usize,
    n_splits: usize,
    seed: u64,
) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if n_splits < 2 {
        return Err(NetGuardError::Data(
            "cross-validation needs at least 2 folds".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(NetGuardError::Data(format!(
            "{n_samples} samples cannot fill {n_splits} folds"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut splits = Vec::with_capacity(n_splits);
    let mut current = 0;
    for fold in 0..n_splits {
        let fold_size = if fold < remainder { base + 1 } else { base };
        let test: Vec<usize> = indices[current..current + fold_size].to_vec();
        let train: Vec<usize> = indices[..current]
            .iter()
            .chain(indices[current + fold_size..].iter())
            .copied()
            .collect();
        splits.push((train, test));
        current += fold_size;
    }
    Ok(splits)
}

fn take_rows(x: &Array2<f64>, y: &Array1<f64>, idx: &[usize]) -> (Array2<f64>, Array1<f64>) {
    let mut sx = Array2::zeros((idx.len(), x.ncols()));
    let mut sy = Array1::zeros(idx.len());
    for (i, &src) in idx.iter().enumerate() {
        sx.row_mut(i).assign(&x.row(src));
        sy[i] = y[src];
    }
    (sx, sy)
}

fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (**t - **p).abs() < 1e-10)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Randomized search over one family's grid, scored by mean CV accuracy.
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    pub n_iter: usize,
    pub cv_folds: usize,
    pub seed: u64,
}

impl RandomizedSearch {
    pub fn new(n_iter: usize, cv_folds: usize, seed: u64) -> Self {
        Self {
            n_iter: n_iter.max(1),
            cv_folds,
            seed,
        }
    }

    /// Sample parameter sets, cross-validate each, then refit the best
    /// parameters on the full training data.
    pub fn best_fit(
        &self,
        family: ModelFamily,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<crate::models::CandidateModel> {
        let grid = family.search_space();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let candidates: Vec<ParamSet> = if grid.is_empty() {
            vec![ParamSet::default()]
        } else {
            (0..self.n_iter).map(|_| grid.sample(&mut rng)).collect()
        };

        let folds = k_fold_indices(x.nrows(), self.cv_folds, self.seed)?;

        let mut best_params = ParamSet::default();
        let mut best_score = f64::NEG_INFINITY;

        for params in candidates {
            let mut fold_scores = Vec::with_capacity(folds.len());
            for (train_idx, test_idx) in &folds {
                let (fx, fy) = take_rows(x, y, train_idx);
                let (vx, vy) = take_rows(x, y, test_idx);

                let mut model = family.build(&params, self.seed);
                model.fit(&fx, &fy)?;
                let pred = model.predict(&vx)?;
                fold_scores.push(accuracy(&vy, &pred));
            }
            let mean = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(family = family.name(), cv_score = mean, "evaluated parameter set");
            if mean > best_score {
                best_score = mean;
                best_params = params;
            }
        }

        let mut model = family.build(&best_params, self.seed);
        model.fit(x, y)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_k_fold_covers_every_sample_once() {
        let splits = k_fold_indices(10, 3, 42).unwrap();
        assert_eq!(splits.len(), 3);

        let mut seen: Vec<usize> = splits.iter().flat_map(|(_, test)| test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        for (train, test) in &splits {
            assert_eq!(train.len() + test.len(), 10);
            assert!(test.iter().all(|i| !train.contains(i)));
        }
    }

    #[test]
    fn test_k_fold_rejects_undersized_input() {
        assert!(k_fold_indices(2, 3, 0).is_err());
        assert!(k_fold_indices(10, 1, 0).is_err());
    }

    #[test]
    fn test_search_returns_fitted_model() {
        let x = array![
            [0.0],
            [0.2],
            [0.4],
            [0.6],
            [5.0],
            [5.2],
            [5.4],
            [5.6],
            [0.1],
            [5.1]
        ];
        let y = array![-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0, 1.0];

        let search = RandomizedSearch::new(4, 3, 42);
        let model = search
            .best_fit(ModelFamily::DecisionTree, &x, &y)
            .unwrap();
        let pred = model.predict(&x).unwrap();
        assert_eq!(pred, y);
    }

    #[test]
    fn test_empty_grid_uses_defaults() {
        let x = array![[-2.0], [-1.0], [-1.5], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let search = RandomizedSearch::new(10, 3, 1);
        let model = search
            .best_fit(ModelFamily::LogisticRegression, &x, &y)
            .unwrap();
        assert!(model.predict(&x).is_ok());
    }
}
