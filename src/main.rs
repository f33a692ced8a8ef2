//! NetGuard - Main entry point
//!
//! Runs the full training pipeline against the configured document store.
//! Configuration comes from the environment:
//!
//! - `NETGUARD_STORE_DIR` - root directory of the JSON document store
//! - `NETGUARD_DATABASE` - database name (default `netguard`)
//! - `NETGUARD_COLLECTION` - collection name (default `phishing`)
//! - `NETGUARD_REMOTE_BUCKET` - optional directory to mirror artifacts into

use netguard::config::RunContext;
use netguard::pipeline::TrainingPipeline;
use netguard::store::JsonDocumentStore;
use netguard::sync::LocalBucketStore;
use netguard::Result;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netguard=info".into()),
        )
        .init();

    let store = JsonDocumentStore::from_env()?;
    let database = std::env::var("NETGUARD_DATABASE").unwrap_or_else(|_| "netguard".to_string());
    let collection =
        std::env::var("NETGUARD_COLLECTION").unwrap_or_else(|_| "phishing".to_string());

    let ctx = RunContext::new();
    let mut pipeline = TrainingPipeline::new(ctx, &database, &collection);
    if let Ok(bucket) = std::env::var("NETGUARD_REMOTE_BUCKET") {
        pipeline = pipeline.with_remote_store(Box::new(LocalBucketStore::new(bucket)));
    }

    let artifact = pipeline.run(&store)?;
    info!(
        model = %artifact.trained_model_file_path.display(),
        train_f1 = artifact.train_metrics.f1_score,
        test_f1 = artifact.test_metrics.f1_score,
        "pipeline finished"
    );
    Ok(())
}
