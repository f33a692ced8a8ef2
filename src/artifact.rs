//! Stage handoff artifacts
//!
//! Each stage returns an immutable record of its outputs; the next stage (or
//! the orchestrator) consumes only that record and never reaches backward
//! into an ancestor's intermediate state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metrics::ClassificationMetrics;

/// Output of the data ingestion stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub trained_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

/// Output of the data validation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationArtifact {
    /// True iff schema checks passed on both partitions.
    ///
    /// The orchestrator refuses to run transformation when this is false.
    pub validation_status: bool,
    /// True iff the KS test flagged drift in any column
    pub drift_detected: bool,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
}

/// Output of the data transformation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationArtifact {
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
}

/// Output of the model trainer stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerArtifact {
    pub trained_model_file_path: PathBuf,
    pub train_metrics: ClassificationMetrics,
    pub test_metrics: ClassificationMetrics,
}
