//! NetGuard - Network security training pipeline
//!
//! A sequential training pipeline for binary intrusion classification:
//! ingestion from a document store, schema and drift validation, KNN-imputed
//! transformation, and model training over a fixed classifier catalog with
//! randomized hyperparameter search.
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`ingestion`] - Collection export, sentinel cleanup, train/test split
//! - [`validation`] - Schema checks and KS drift detection
//! - [`transformation`] - Feature recode and KNN imputation to dense matrices
//! - [`trainer`] - Catalog search, candidate selection, bundle persistence
//! - [`pipeline`] - Stage orchestration
//!
//! ## Modeling
//! - [`models`] - Classifier families behind a single trait
//! - [`search`] - Randomized hyperparameter search with K-fold CV
//! - [`imputation`] - KNN missing-value imputation
//! - [`metrics`] - Classification metrics and ranking score
//! - [`estimator`] - The deployable preprocessor + model bundle
//!
//! ## Infrastructure
//! - [`artifact`] - Typed stage handoff records
//! - [`config`] - Run context and per-stage configuration
//! - [`schema`] - Declarative column schema
//! - [`store`] - Document store access
//! - [`persist`] - Blob and tabular persistence
//! - [`tracking`] - Experiment tracking
//! - [`sync`] - Remote artifact mirroring

pub mod error;

// Pipeline stages
pub mod ingestion;
pub mod pipeline;
pub mod trainer;
pub mod transformation;
pub mod validation;

// Modeling
pub mod estimator;
pub mod imputation;
pub mod metrics;
pub mod models;
pub mod search;

// Infrastructure
pub mod artifact;
pub mod config;
pub mod persist;
pub mod schema;
pub mod store;
pub mod sync;
pub mod tracking;

pub use error::{NetGuardError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{NetGuardError, Result};

    pub use crate::config::{
        FitSource, IngestionConfig, RunContext, TrainerConfig, TransformationConfig,
        ValidationConfig,
    };

    pub use crate::artifact::{
        IngestionArtifact, TrainerArtifact, TransformationArtifact, ValidationArtifact,
    };

    pub use crate::estimator::NetworkModel;
    pub use crate::imputation::{KnnImputer, Preprocessor, WeightScheme};
    pub use crate::metrics::ClassificationMetrics;
    pub use crate::models::{catalog, CandidateModel, Classifier, ModelFamily};
    pub use crate::pipeline::TrainingPipeline;
    pub use crate::store::{DocumentStore, JsonDocumentStore};
    pub use crate::sync::{LocalBucketStore, RemoteStore};
}
