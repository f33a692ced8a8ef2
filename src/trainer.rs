//! Model trainer stage
//!
//! Runs randomized hyperparameter search for every catalog family, ranks the
//! fitted candidates on the held-out test partition, evaluates the winner,
//! records both evaluations with the experiment tracker, and persists the
//! winner paired with the run's preprocessor as the inference bundle.

use ndarray::{s, Array1, Array2};
use tracing::info;

use crate::artifact::{TrainerArtifact, TransformationArtifact};
use crate::config::TrainerConfig;
use crate::error::{NetGuardError, Result};
use crate::estimator::NetworkModel;
use crate::imputation::Preprocessor;
use crate::metrics::{r2_score, ClassificationMetrics};
use crate::models::{catalog, CandidateModel, Classifier};
use crate::persist;
use crate::search::RandomizedSearch;
use crate::tracking::ExperimentTracker;

pub struct ModelTrainer {
    transformation_artifact: TransformationArtifact,
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(transformation_artifact: TransformationArtifact, config: TrainerConfig) -> Self {
        Self {
            transformation_artifact,
            config,
        }
    }

    pub fn run(&self) -> Result<TrainerArtifact> {
        let train = persist::load_array(&self.transformation_artifact.transformed_train_file_path)?;
        let test = persist::load_array(&self.transformation_artifact.transformed_test_file_path)?;

        let (x_train, y_train) = split_target(&train)?;
        let (x_test, y_test) = split_target(&test)?;

        let (best_name, best_model) = self.select_best(&x_train, &y_train, &x_test, &y_test)?;

        let train_pred = best_model.predict(&x_train)?;
        let test_pred = best_model.predict(&x_test)?;
        let train_metrics = ClassificationMetrics::compute(&y_train, &train_pred);
        let test_metrics = ClassificationMetrics::compute(&y_test, &test_pred);

        let preprocessor: Preprocessor =
            persist::load_object(&self.transformation_artifact.transformed_object_file_path)?;
        let bundle = NetworkModel::new(preprocessor, best_model);
        persist::save_object(&self.config.trained_model_file_path, &bundle)?;

        self.track_evaluation("train_metrics", &train_metrics)?;
        self.track_evaluation("test_metrics", &test_metrics)?;

        info!(
            model = best_name,
            train_f1 = train_metrics.f1_score,
            test_f1 = test_metrics.f1_score,
            "model trainer finished"
        );
        Ok(TrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            train_metrics,
            test_metrics,
        })
    }

    /// Search every family, rank fitted candidates by test-partition r2.
    ///
    /// Ties keep the earliest catalog entry.
    fn select_best(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<(&'static str, CandidateModel)> {
        let search = RandomizedSearch::new(
            self.config.search_iterations,
            self.config.cv_folds,
            self.config.seed,
        );

        let mut candidates: Vec<(&'static str, CandidateModel)> = Vec::new();
        let mut scores: Vec<f64> = Vec::new();
        for family in catalog() {
            let model = search.best_fit(family, x_train, y_train)?;
            let pred = model.predict(x_test)?;
            let score = r2_score(y_test, &pred);
            info!(family = family.name(), test_score = score, "searched family");
            candidates.push((family.name(), model));
            scores.push(score);
        }

        let winner = best_index(&scores)
            .ok_or_else(|| NetGuardError::Data("empty model catalog".to_string()))?;
        Ok(candidates.swap_remove(winner))
    }

    fn track_evaluation(&self, run_name: &str, metrics: &ClassificationMetrics) -> Result<()> {
        let tracker = ExperimentTracker::new(&self.config.tracking_dir);
        let mut run = tracker.start_run(run_name);
        run.log_metric("f1_score", metrics.f1_score);
        run.log_metric("precision", metrics.precision);
        run.log_metric("recall", metrics.recall);
        run.log_artifact(&self.config.trained_model_file_path);
        run.end_run()
    }
}

/// Index of the strictly maximum score; ties keep the earliest entry.
fn best_index(scores: &[f64]) -> Option<usize> {
    let mut best = None;
    let mut best_score = f64::NEG_INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best_score = score;
            best = Some(i);
        }
    }
    best
}

/// Split a combined matrix into features and its final target column.
fn split_target(matrix: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    if matrix.ncols() < 2 {
        return Err(NetGuardError::Shape {
            expected: "at least 2 columns (features plus target)".to_string(),
            actual: format!("{} columns", matrix.ncols()),
        });
    }
    let last = matrix.ncols() - 1;
    let x = matrix.slice(s![.., ..last]).to_owned();
    let y = matrix.column(last).to_owned();
    Ok((x, y))
}
