//! Experiment tracking
//!
//! Records named metrics and artifact references against a run handle. Each
//! run is persisted as one JSON document under the tracking directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// One tracked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedRun {
    pub run_name: String,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<PathBuf>,
}

/// File-backed experiment tracker
#[derive(Debug, Clone)]
pub struct ExperimentTracker {
    base_dir: PathBuf,
}

impl ExperimentTracker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Open a run handle; metrics and artifacts accumulate until `end_run`.
    pub fn start_run(&self, run_name: &str) -> RunHandle {
        RunHandle {
            base_dir: self.base_dir.clone(),
            record: TrackedRun {
                run_name: run_name.to_string(),
                started_at: Utc::now().timestamp(),
                ended_at: None,
                metrics: BTreeMap::new(),
                artifacts: Vec::new(),
            },
        }
    }
}

/// Handle for one in-flight tracked run
#[derive(Debug)]
pub struct RunHandle {
    base_dir: PathBuf,
    record: TrackedRun,
}

impl RunHandle {
    pub fn log_metric(&mut self, name: &str, value: f64) {
        self.record.metrics.insert(name.to_string(), value);
    }

    /// Register a model (or any file) produced by this run.
    pub fn log_artifact(&mut self, path: &Path) {
        self.record.artifacts.push(path.to_path_buf());
    }

    /// Close the run and persist its record.
    pub fn end_run(mut self) -> Result<()> {
        self.record.ended_at = Some(Utc::now().timestamp());
        std::fs::create_dir_all(&self.base_dir)?;
        let file = self
            .base_dir
            .join(format!("{}.json", self.record.run_name));
        let body = serde_json::to_string_pretty(&self.record)?;
        std::fs::write(&file, body)?;
        info!(run = %self.record.run_name, metrics = self.record.metrics.len(), "tracked run closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_record_persists_metrics_and_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::new(dir.path());

        let mut run = tracker.start_run("train_metrics");
        run.log_metric("f1_score", 0.91);
        run.log_metric("precision", 0.88);
        run.log_artifact(Path::new("artifacts/run/model.bin"));
        run.end_run().unwrap();

        let raw = std::fs::read_to_string(dir.path().join("train_metrics.json")).unwrap();
        let record: TrackedRun = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.metrics["f1_score"], 0.91);
        assert_eq!(record.artifacts.len(), 1);
        assert!(record.ended_at.is_some());
    }
}
