//! Classifier families for the trainer catalog
//!
//! Compact native implementations behind a single [`Classifier`] trait. All
//! models accept arbitrary binary label pairs (the source dataset encodes the
//! target as -1/1) by mapping labels to internal class codes.

pub mod adaboost;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod logistic;
pub mod random_forest;

pub use adaboost::AdaBoost;
pub use decision_tree::{Criterion, DecisionTree, MaxFeatures};
pub use gradient_boosting::GradientBoosting;
pub use logistic::LogisticRegression;
pub use random_forest::RandomForest;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};
use crate::search::{ParamGrid, ParamSet, ParamValue};

/// Trait every catalog model implements
pub trait Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Sorted distinct labels of a target vector.
pub(crate) fn class_labels(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = Vec::new();
    for &v in y.iter() {
        if !classes.iter().any(|&c| (c - v).abs() < 1e-10) {
            classes.push(v);
        }
    }
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    classes
}

/// Map labels onto 0/1 codes. At most two classes are supported.
pub(crate) fn encode_binary(y: &Array1<f64>, classes: &[f64]) -> Result<Array1<f64>> {
    if classes.len() > 2 {
        return Err(NetGuardError::Data(format!(
            "binary classifier given {} classes",
            classes.len()
        )));
    }
    Ok(y.mapv(|v| {
        if classes.len() == 2 && (v - classes[1]).abs() < 1e-10 {
            1.0
        } else {
            0.0
        }
    }))
}

/// The classifier families the trainer searches over, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFamily {
    RandomForest,
    DecisionTree,
    GradientBoosting,
    LogisticRegression,
    AdaBoost,
}

/// Fixed candidate catalog; selection ties break on this order.
pub fn catalog() -> Vec<ModelFamily> {
    vec![
        ModelFamily::RandomForest,
        ModelFamily::DecisionTree,
        ModelFamily::GradientBoosting,
        ModelFamily::LogisticRegression,
        ModelFamily::AdaBoost,
    ]
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::DecisionTree => "Decision Tree",
            ModelFamily::GradientBoosting => "Gradient Boosting",
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::AdaBoost => "Ada Boost",
        }
    }

    /// Declared hyperparameter search space. An empty grid means the family
    /// is evaluated with default parameters only.
    pub fn search_space(&self) -> ParamGrid {
        match self {
            ModelFamily::DecisionTree => ParamGrid::new()
                .with("criterion", vec![ParamValue::from("gini"), ParamValue::from("entropy")])
                .with(
                    "max_features",
                    vec![ParamValue::from("sqrt"), ParamValue::from("log2")],
                )
                .with(
                    "max_depth",
                    vec![ParamValue::from(4i64), ParamValue::from(8i64), ParamValue::from(16i64)],
                ),
            ModelFamily::RandomForest => ParamGrid::new()
                .with("criterion", vec![ParamValue::from("gini"), ParamValue::from("entropy")])
                .with(
                    "max_features",
                    vec![ParamValue::from("sqrt"), ParamValue::from("log2"), ParamValue::from("all")],
                )
                .with(
                    "n_estimators",
                    vec![
                        ParamValue::from(8i64),
                        ParamValue::from(16i64),
                        ParamValue::from(32i64),
                        ParamValue::from(64i64),
                        ParamValue::from(128i64),
                    ],
                ),
            ModelFamily::GradientBoosting => ParamGrid::new()
                .with(
                    "learning_rate",
                    vec![
                        ParamValue::from(0.1),
                        ParamValue::from(0.05),
                        ParamValue::from(0.01),
                        ParamValue::from(0.001),
                    ],
                )
                .with(
                    "subsample",
                    vec![
                        ParamValue::from(0.6),
                        ParamValue::from(0.7),
                        ParamValue::from(0.8),
                        ParamValue::from(0.9),
                    ],
                )
                .with(
                    "n_estimators",
                    vec![
                        ParamValue::from(8i64),
                        ParamValue::from(16i64),
                        ParamValue::from(32i64),
                        ParamValue::from(64i64),
                    ],
                ),
            ModelFamily::AdaBoost => ParamGrid::new()
                .with(
                    "learning_rate",
                    vec![
                        ParamValue::from(0.1),
                        ParamValue::from(0.05),
                        ParamValue::from(0.01),
                        ParamValue::from(0.001),
                    ],
                )
                .with(
                    "n_estimators",
                    vec![
                        ParamValue::from(8i64),
                        ParamValue::from(16i64),
                        ParamValue::from(32i64),
                        ParamValue::from(64i64),
                    ],
                ),
            ModelFamily::LogisticRegression => ParamGrid::new(),
        }
    }

    /// Build an unfitted model from a sampled parameter set.
    pub fn build(&self, params: &ParamSet, seed: u64) -> CandidateModel {
        match self {
            ModelFamily::DecisionTree => {
                let mut tree = DecisionTree::new()
                    .with_criterion(criterion_param(params))
                    .with_max_features(max_features_param(params))
                    .with_seed(seed);
                if let Some(depth) = params.get_int("max_depth") {
                    tree = tree.with_max_depth(depth as usize);
                }
                CandidateModel::DecisionTree(tree)
            }
            ModelFamily::RandomForest => {
                let n = params.get_int("n_estimators").unwrap_or(100) as usize;
                CandidateModel::RandomForest(
                    RandomForest::new(n)
                        .with_criterion(criterion_param(params))
                        .with_max_features(max_features_param(params))
                        .with_seed(seed),
                )
            }
            ModelFamily::GradientBoosting => {
                let mut model = GradientBoosting::default().with_seed(seed);
                if let Some(n) = params.get_int("n_estimators") {
                    model = model.with_n_estimators(n as usize);
                }
                if let Some(lr) = params.get_float("learning_rate") {
                    model = model.with_learning_rate(lr);
                }
                if let Some(sub) = params.get_float("subsample") {
                    model = model.with_subsample(sub);
                }
                CandidateModel::GradientBoosting(model)
            }
            ModelFamily::LogisticRegression => {
                CandidateModel::LogisticRegression(LogisticRegression::default())
            }
            ModelFamily::AdaBoost => {
                let mut model = AdaBoost::default();
                if let Some(n) = params.get_int("n_estimators") {
                    model = model.with_n_estimators(n as usize);
                }
                if let Some(lr) = params.get_float("learning_rate") {
                    model = model.with_learning_rate(lr);
                }
                CandidateModel::AdaBoost(model)
            }
        }
    }
}

fn criterion_param(params: &ParamSet) -> Criterion {
    match params.get_str("criterion") {
        Some("entropy") => Criterion::Entropy,
        _ => Criterion::Gini,
    }
}

fn max_features_param(params: &ParamSet) -> MaxFeatures {
    match params.get_str("max_features") {
        Some("sqrt") => MaxFeatures::Sqrt,
        Some("log2") => MaxFeatures::Log2,
        _ => MaxFeatures::All,
    }
}

/// One fitted (or unfitted) candidate of any family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateModel {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoosting),
    LogisticRegression(LogisticRegression),
    AdaBoost(AdaBoost),
}

impl Classifier for CandidateModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            CandidateModel::RandomForest(m) => m.fit(x, y),
            CandidateModel::DecisionTree(m) => m.fit(x, y),
            CandidateModel::GradientBoosting(m) => m.fit(x, y),
            CandidateModel::LogisticRegression(m) => m.fit(x, y),
            CandidateModel::AdaBoost(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            CandidateModel::RandomForest(m) => m.predict(x),
            CandidateModel::DecisionTree(m) => m.predict(x),
            CandidateModel::GradientBoosting(m) => m.predict(x),
            CandidateModel::LogisticRegression(m) => m.predict(x),
            CandidateModel::AdaBoost(m) => m.predict(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_labels_sorted_unique() {
        let y = array![1.0, -1.0, 1.0, -1.0, 1.0];
        assert_eq!(class_labels(&y), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_encode_binary_maps_to_codes() {
        let y = array![1.0, -1.0, 1.0];
        let classes = class_labels(&y);
        let codes = encode_binary(&y, &classes).unwrap();
        assert_eq!(codes, array![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_catalog_order_is_fixed() {
        let names: Vec<&str> = catalog().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "Random Forest",
                "Decision Tree",
                "Gradient Boosting",
                "Logistic Regression",
                "Ada Boost"
            ]
        );
    }

    #[test]
    fn test_logistic_search_space_is_empty() {
        assert!(ModelFamily::LogisticRegression.search_space().is_empty());
    }
}
