//! Training pipeline orchestrator
//!
//! Drives the four stages strictly in order, each stage consuming only the
//! artifact of its predecessor. A failed validation verdict stops the run
//! before transformation. When a remote store is attached, the run's artifact
//! tree and the final model are mirrored after training.

use tracing::info;

use crate::artifact::TrainerArtifact;
use crate::config::{
    IngestionConfig, RunContext, TrainerConfig, TransformationConfig, ValidationConfig,
};
use crate::error::{NetGuardError, Result};
use crate::ingestion::DataIngestion;
use crate::store::DocumentStore;
use crate::sync::RemoteStore;
use crate::trainer::ModelTrainer;
use crate::transformation::DataTransformation;
use crate::validation::DataValidation;

pub struct TrainingPipeline {
    ctx: RunContext,
    ingestion_config: IngestionConfig,
    validation_config: ValidationConfig,
    transformation_config: TransformationConfig,
    trainer_config: TrainerConfig,
    remote_store: Option<Box<dyn RemoteStore>>,
}

impl TrainingPipeline {
    pub fn new(ctx: RunContext, database_name: &str, collection_name: &str) -> Self {
        Self {
            ingestion_config: IngestionConfig::new(&ctx, database_name, collection_name),
            validation_config: ValidationConfig::new(&ctx),
            transformation_config: TransformationConfig::new(&ctx),
            trainer_config: TrainerConfig::new(&ctx),
            remote_store: None,
            ctx,
        }
    }

    pub fn with_ingestion_config(mut self, config: IngestionConfig) -> Self {
        self.ingestion_config = config;
        self
    }

    pub fn with_validation_config(mut self, config: ValidationConfig) -> Self {
        self.validation_config = config;
        self
    }

    pub fn with_transformation_config(mut self, config: TransformationConfig) -> Self {
        self.transformation_config = config;
        self
    }

    pub fn with_trainer_config(mut self, config: TrainerConfig) -> Self {
        self.trainer_config = config;
        self
    }

    /// Attach a destination for post-run artifact mirroring.
    pub fn with_remote_store(mut self, store: Box<dyn RemoteStore>) -> Self {
        self.remote_store = Some(store);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.ctx.run_id
    }

    /// Execute ingestion, validation, transformation and training in order.
    pub fn run(&self, store: &dyn DocumentStore) -> Result<TrainerArtifact> {
        info!(run_id = %self.ctx.run_id, "starting training pipeline");

        let ingestion_artifact = DataIngestion::new(self.ingestion_config.clone()).run(store)?;
        info!(run_id = %self.ctx.run_id, "data ingestion complete");

        let validation_artifact =
            DataValidation::new(ingestion_artifact, self.validation_config.clone())?.run()?;
        if !validation_artifact.validation_status {
            return Err(NetGuardError::ValidationFailed(format!(
                "schema checks failed, see {}",
                validation_artifact.drift_report_file_path.display()
            )));
        }
        info!(
            run_id = %self.ctx.run_id,
            drift_detected = validation_artifact.drift_detected,
            "data validation complete"
        );

        let transformation_artifact =
            DataTransformation::new(validation_artifact, self.transformation_config.clone())
                .run()?;
        info!(run_id = %self.ctx.run_id, "data transformation complete");

        let trainer_artifact =
            ModelTrainer::new(transformation_artifact, self.trainer_config.clone()).run()?;
        info!(run_id = %self.ctx.run_id, "model training complete");

        self.sync_artifacts(&trainer_artifact)?;
        Ok(trainer_artifact)
    }

    fn sync_artifacts(&self, trainer_artifact: &TrainerArtifact) -> Result<()> {
        let Some(remote) = &self.remote_store else {
            return Ok(());
        };

        remote.sync(
            &self.ctx.artifact_dir,
            &format!("artifacts/{}", self.ctx.run_id),
        )?;
        if let Some(model_dir) = trainer_artifact.trained_model_file_path.parent() {
            remote.sync(model_dir, &format!("final_model/{}", self.ctx.run_id))?;
        }
        Ok(())
    }
}
