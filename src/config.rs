//! Run context and per-stage configuration
//!
//! Every path a stage touches derives from a single [`RunContext`] so that one
//! pipeline execution is fully scoped by its timestamp run identifier.

use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Name of the target column in the source dataset
pub const TARGET_COLUMN: &str = "Result";

/// Literal string the source store uses for a missing value
pub const MISSING_SENTINEL: &str = "na";

/// Default path of the declarative column schema
pub const SCHEMA_FILE_PATH: &str = "data_schema/schema.yaml";

/// Default fraction of rows assigned to the test partition
pub const DEFAULT_SPLIT_RATIO: f64 = 0.2;

/// Default RNG seed so successive runs reproduce the same split
pub const DEFAULT_SEED: u64 = 42;

const ARTIFACT_DIR: &str = "artifacts";
const FEATURE_STORE_FILE: &str = "phishing_data.csv";
const TRAIN_FILE: &str = "train.csv";
const TEST_FILE: &str = "test.csv";

/// Identity of one pipeline execution.
///
/// Created once at orchestrator start and never mutated; all stage configs
/// derive their paths from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Timestamp-derived run identifier
    pub run_id: String,
    /// Root directory holding every artifact of this run
    pub artifact_dir: PathBuf,
    /// Seed threaded through every random operation of the run
    pub seed: u64,
}

impl RunContext {
    /// Create a context stamped with the current local time.
    pub fn new() -> Self {
        let run_id = Local::now().format("%m_%d_%Y_%H_%M_%S").to_string();
        Self::with_run_id(run_id)
    }

    /// Create a context for an explicit run identifier.
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        Self {
            artifact_dir: PathBuf::from(ARTIFACT_DIR).join(&run_id),
            run_id,
            seed: DEFAULT_SEED,
        }
    }

    /// Override the run seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Root the artifact tree somewhere other than `./artifacts`.
    pub fn rooted_at(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_dir = root.into().join(&self.run_id);
        self
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the data ingestion stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub feature_store_file_path: PathBuf,
    pub training_file_path: PathBuf,
    pub testing_file_path: PathBuf,
    /// Fraction of rows that go to the test partition, in (0, 1)
    pub split_ratio: f64,
    pub database_name: String,
    pub collection_name: String,
    pub seed: u64,
}

impl IngestionConfig {
    pub fn new(ctx: &RunContext, database_name: &str, collection_name: &str) -> Self {
        let dir = ctx.artifact_dir.join("data_ingestion");
        Self {
            feature_store_file_path: dir.join("feature_store").join(FEATURE_STORE_FILE),
            training_file_path: dir.join("ingested").join(TRAIN_FILE),
            testing_file_path: dir.join("ingested").join(TEST_FILE),
            split_ratio: DEFAULT_SPLIT_RATIO,
            database_name: database_name.to_string(),
            collection_name: collection_name.to_string(),
            seed: ctx.seed,
        }
    }

    pub fn with_split_ratio(mut self, ratio: f64) -> Self {
        self.split_ratio = ratio;
        self
    }
}

/// Configuration for the data validation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub schema_file_path: PathBuf,
    /// Significance level for the two-sample KS test
    pub drift_threshold: f64,
}

impl ValidationConfig {
    pub fn new(ctx: &RunContext) -> Self {
        let dir = ctx.artifact_dir.join("data_validation");
        Self {
            valid_train_file_path: dir.join("validated").join(TRAIN_FILE),
            valid_test_file_path: dir.join("validated").join(TEST_FILE),
            drift_report_file_path: dir.join("drift_report").join("report.yaml"),
            schema_file_path: PathBuf::from(SCHEMA_FILE_PATH),
            drift_threshold: 0.05,
        }
    }

    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_file_path = path.into();
        self
    }
}

/// Which partition the imputer's fit runs on.
///
/// The reference implementation fit on the test partition; that is a
/// correctness defect (transform parameters must come from data available at
/// training time), so `Train` is the default and `Test` only reproduces the
/// legacy behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitSource {
    Train,
    Test,
}

/// Configuration for the data transformation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationConfig {
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    /// Neighbor count of the KNN imputer
    pub imputer_neighbors: usize,
    /// Neighbor weighting of the KNN imputer
    pub imputer_weights: crate::imputation::WeightScheme,
    pub fit_source: FitSource,
}

impl TransformationConfig {
    pub fn new(ctx: &RunContext) -> Self {
        let dir = ctx.artifact_dir.join("data_transformation");
        Self {
            transformed_train_file_path: dir.join("transformed").join("train.bin"),
            transformed_test_file_path: dir.join("transformed").join("test.bin"),
            transformed_object_file_path: dir.join("transformed_object").join("preprocessor.bin"),
            imputer_neighbors: 3,
            imputer_weights: crate::imputation::WeightScheme::Uniform,
            fit_source: FitSource::Train,
        }
    }

    pub fn with_fit_source(mut self, source: FitSource) -> Self {
        self.fit_source = source;
        self
    }
}

/// Configuration for the model trainer stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub trained_model_file_path: PathBuf,
    /// Directory the experiment tracker writes run records to
    pub tracking_dir: PathBuf,
    /// Cross-validation folds for hyperparameter search
    pub cv_folds: usize,
    /// Parameter sets sampled per family
    pub search_iterations: usize,
    pub seed: u64,
}

impl TrainerConfig {
    pub fn new(ctx: &RunContext) -> Self {
        let dir = ctx.artifact_dir.join("model_trainer");
        Self {
            trained_model_file_path: dir.join("trained_model").join("model.bin"),
            tracking_dir: dir.join("tracking"),
            cv_folds: 3,
            search_iterations: 10,
            seed: ctx.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_paths_derive_from_run_context() {
        let ctx = RunContext::with_run_id("01_02_2026_10_00_00");
        let ingestion = IngestionConfig::new(&ctx, "netguard", "phishing");
        let validation = ValidationConfig::new(&ctx);
        let transformation = TransformationConfig::new(&ctx);
        let trainer = TrainerConfig::new(&ctx);

        for path in [
            &ingestion.feature_store_file_path,
            &validation.drift_report_file_path,
            &transformation.transformed_object_file_path,
            &trainer.trained_model_file_path,
        ] {
            assert!(path.starts_with(&ctx.artifact_dir));
        }
    }

    #[test]
    fn test_seed_defaults_to_fixed_constant() {
        let ctx = RunContext::with_run_id("run");
        assert_eq!(ctx.seed, DEFAULT_SEED);
        assert_eq!(ctx.clone().with_seed(7).seed, 7);
    }
}
