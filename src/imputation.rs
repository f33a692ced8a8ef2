//! KNN missing-value imputation
//!
//! The fitted imputer is the single stateful preprocessing object of the
//! pipeline; the transformation stage persists it and the inference bundle
//! carries the exact same fit.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};

/// A cell is missing when it is NaN.
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Neighbor weighting scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors contribute equally
    Uniform,
    /// Closer neighbors contribute more (inverse distance)
    Distance,
}

impl Default for WeightScheme {
    fn default() -> Self {
        Self::Uniform
    }
}

/// Max-heap entry so the heap evicts the farthest kept neighbor
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// K-nearest-neighbors imputer.
///
/// `fit` keeps the complete rows of the fit partition plus per-feature means
/// as a fallback; `transform` fills every missing cell from the k nearest
/// complete rows, with distance computed over co-observed features only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
    weights: WeightScheme,
    complete_data: Option<Array2<f64>>,
    feature_means: Option<Array1<f64>>,
}

impl KnnImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            weights: WeightScheme::Uniform,
            complete_data: None,
            feature_means: None,
        }
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.complete_data.is_some()
    }

    /// Euclidean distance over features observed in both rows.
    fn distance(a: &[f64], b: &[f64]) -> f64 {
        let mut count = 0usize;
        let mut accum = 0.0f64;
        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if is_missing(ai) || is_missing(bi) {
                continue;
            }
            count += 1;
            let d = ai - bi;
            accum += d * d;
        }
        if count == 0 {
            f64::INFINITY
        } else {
            (accum / count as f64).sqrt()
        }
    }

    fn find_neighbors(&self, sample: &[f64]) -> Vec<(usize, f64)> {
        let data = self
            .complete_data
            .as_ref()
            .expect("checked fitted before neighbor search");
        let k = self.n_neighbors;
        let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(k + 1);

        let mut row_buf: Vec<f64> = Vec::with_capacity(data.ncols());
        for (i, row) in data.rows().into_iter().enumerate() {
            let dist = match row.as_slice() {
                Some(s) => Self::distance(sample, s),
                None => {
                    row_buf.clear();
                    row_buf.extend(row.iter().copied());
                    Self::distance(sample, &row_buf)
                }
            };
            if !dist.is_finite() {
                continue;
            }
            if heap.len() < k {
                heap.push(DistanceIdx(dist, i));
            } else if let Some(&DistanceIdx(max_dist, _)) = heap.peek() {
                if dist < max_dist {
                    heap.pop();
                    heap.push(DistanceIdx(dist, i));
                }
            }
        }

        heap.into_iter().map(|DistanceIdx(d, i)| (i, d)).collect()
    }

    fn impute_value(&self, neighbors: &[(usize, f64)], feature_idx: usize) -> f64 {
        let data = self
            .complete_data
            .as_ref()
            .expect("checked fitted before imputing");
        let fallback = || {
            self.feature_means
                .as_ref()
                .map(|m| m[feature_idx])
                .unwrap_or(0.0)
        };

        if neighbors.is_empty() {
            return fallback();
        }

        match self.weights {
            WeightScheme::Distance => {
                let mut weighted_sum = 0.0;
                let mut weight_sum = 0.0;
                for &(idx, dist) in neighbors {
                    let weight = if dist < 1e-10 { 1e10 } else { 1.0 / dist };
                    weighted_sum += data[[idx, feature_idx]] * weight;
                    weight_sum += weight;
                }
                if weight_sum > 0.0 {
                    weighted_sum / weight_sum
                } else {
                    fallback()
                }
            }
            WeightScheme::Uniform => {
                let sum: f64 = neighbors
                    .iter()
                    .map(|&(idx, _)| data[[idx, feature_idx]])
                    .sum();
                sum / neighbors.len() as f64
            }
        }
    }

    /// Fit on a feature matrix: retain its complete rows and feature means.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let complete_rows: Vec<usize> = x
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().any(|&v| is_missing(v)))
            .map(|(i, _)| i)
            .collect();

        if complete_rows.is_empty() {
            return Err(NetGuardError::Data(
                "no complete rows available to fit KNN imputer".to_string(),
            ));
        }

        let n_features = x.ncols();
        let mut complete_data = Array2::zeros((complete_rows.len(), n_features));
        for (i, &row_idx) in complete_rows.iter().enumerate() {
            for j in 0..n_features {
                complete_data[[i, j]] = x[[row_idx, j]];
            }
        }

        let feature_means = complete_data
            .mean_axis(Axis(0))
            .ok_or_else(|| NetGuardError::Data("cannot compute feature means".to_string()))?;

        self.complete_data = Some(complete_data);
        self.feature_means = Some(feature_means);
        Ok(())
    }

    /// Fill every missing cell of `x`.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(NetGuardError::ModelNotFitted);
        }

        let n_features = x.ncols();
        if let Some(data) = &self.complete_data {
            if data.ncols() != n_features {
                return Err(NetGuardError::Shape {
                    expected: format!("{} features", data.ncols()),
                    actual: format!("{n_features} features"),
                });
            }
        }

        let mut result = x.clone();
        let mut row_buf: Vec<f64> = Vec::with_capacity(n_features);

        for (row_idx, row) in x.rows().into_iter().enumerate() {
            if !row.iter().any(|&v| is_missing(v)) {
                continue;
            }

            row_buf.clear();
            row_buf.extend(row.iter().copied());
            let neighbors = self.find_neighbors(&row_buf);

            for j in 0..n_features {
                if is_missing(row_buf[j]) {
                    result[[row_idx, j]] = self.impute_value(&neighbors, j);
                }
            }
        }

        Ok(result)
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(3)
    }
}

/// The transformer object of a run: the imputation step behind one handle.
///
/// Persisted once per run and owned, as the exact same fit, by both the
/// transformation artifact and the final inference bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    imputer: KnnImputer,
}

impl Preprocessor {
    pub fn new(imputer: KnnImputer) -> Self {
        Self { imputer }
    }

    pub fn is_fitted(&self) -> bool {
        self.imputer.is_fitted()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.imputer.fit(x)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.imputer.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imputer_fills_missing_values() {
        let data = Array2::from_shape_vec(
            (6, 2),
            vec![
                1.0,
                10.0,
                2.0,
                20.0,
                3.0,
                30.0,
                4.0,
                40.0,
                f64::NAN,
                25.0,
                2.5,
                f64::NAN,
            ],
        )
        .unwrap();

        let mut imputer = KnnImputer::new(3);
        imputer.fit(&data).unwrap();
        let result = imputer.transform(&data).unwrap();

        assert!(!result.iter().any(|&v| v.is_nan()));
        assert!(result[[4, 0]] >= 1.0 && result[[4, 0]] <= 4.0);
        assert!(result[[5, 1]] >= 10.0 && result[[5, 1]] <= 40.0);
    }

    #[test]
    fn test_distance_weighting_prefers_close_rows() {
        let data = Array2::from_shape_vec(
            (5, 2),
            vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 0.1, f64::NAN],
        )
        .unwrap();

        let mut imputer = KnnImputer::new(3).with_weights(WeightScheme::Distance);
        imputer.fit(&data).unwrap();
        let result = imputer.transform(&data).unwrap();

        assert!(result[[4, 1]].abs() < 1.0);
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let imputer = KnnImputer::new(3);
        let x = Array2::zeros((2, 2));
        assert!(matches!(
            imputer.transform(&x),
            Err(NetGuardError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_fit_without_complete_rows_errors() {
        let data = Array2::from_shape_vec((2, 2), vec![f64::NAN, 1.0, 2.0, f64::NAN]).unwrap();
        let mut imputer = KnnImputer::new(1);
        assert!(imputer.fit(&data).is_err());
    }

    #[test]
    fn test_preprocessor_round_trips_through_blob() {
        let data =
            Array2::from_shape_vec((4, 2), vec![1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0]).unwrap();
        let mut pre = Preprocessor::new(KnnImputer::new(2));
        pre.fit(&data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pre.bin");
        crate::persist::save_object(&path, &pre).unwrap();
        let loaded: Preprocessor = crate::persist::load_object(&path).unwrap();

        let probe =
            Array2::from_shape_vec((1, 2), vec![f64::NAN, 3.0]).unwrap();
        let a = pre.transform(&probe).unwrap();
        let b = loaded.transform(&probe).unwrap();
        assert_eq!(a[[0, 0]], b[[0, 0]]);
    }
}
