//! Data ingestion stage
//!
//! Fetches the source collection, normalizes store sentinels, persists the
//! full feature-store snapshot, then splits rows into train/test partitions.
//! The full snapshot is written before splitting on purpose: it lets a later
//! run reproduce splits with a different ratio.

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::artifact::IngestionArtifact;
use crate::config::{IngestionConfig, MISSING_SENTINEL};
use crate::error::{NetGuardError, Result};
use crate::persist;
use crate::store::DocumentStore;

pub struct DataIngestion {
    config: IngestionConfig,
}

impl DataIngestion {
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    /// Run the full stage against a store handle scoped to this call.
    pub fn run(&self, store: &dyn DocumentStore) -> Result<IngestionArtifact> {
        let df = self.export_collection(store)?;
        let df = self.export_to_feature_store(df)?;
        self.split_train_test(df)?;

        Ok(IngestionArtifact {
            trained_file_path: self.config.training_file_path.clone(),
            test_file_path: self.config.testing_file_path.clone(),
        })
    }

    /// Fetch the collection, drop the store-assigned id, normalize sentinels.
    fn export_collection(&self, store: &dyn DocumentStore) -> Result<DataFrame> {
        let mut df = store.fetch_collection(&self.config.database_name, &self.config.collection_name)?;
        if df.get_column_names().iter().any(|n| n.as_str() == "_id") {
            df = df.drop("_id")?;
        }
        normalize_sentinels(&mut df)?;
        Ok(df)
    }

    fn export_to_feature_store(&self, mut df: DataFrame) -> Result<DataFrame> {
        persist::write_csv(&self.config.feature_store_file_path, &mut df)?;
        info!(
            rows = df.height(),
            path = %self.config.feature_store_file_path.display(),
            "wrote feature store snapshot"
        );
        Ok(df)
    }

    /// Seeded random row split; no stratification.
    fn split_train_test(&self, df: DataFrame) -> Result<()> {
        let ratio = self.config.split_ratio;
        if !(0.0..=1.0).contains(&ratio) || ratio == 0.0 || ratio == 1.0 {
            return Err(NetGuardError::Data(format!(
                "split ratio must be in (0, 1), got {ratio}"
            )));
        }

        let n = df.height();
        if n < 2 {
            return Err(NetGuardError::Data(format!(
                "cannot split {n} rows into train and test"
            )));
        }

        let mut indices: Vec<u32> = (0..n as u32).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let n_test = ((n as f64) * ratio).round().clamp(1.0, (n - 1) as f64) as usize;
        let test_idx = IdxCa::from_vec("idx".into(), indices[..n_test].to_vec());
        let train_idx = IdxCa::from_vec("idx".into(), indices[n_test..].to_vec());

        let mut test = df.take(&test_idx)?;
        let mut train = df.take(&train_idx)?;

        persist::write_csv(&self.config.training_file_path, &mut train)?;
        persist::write_csv(&self.config.testing_file_path, &mut test)?;
        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            "performed train/test split"
        );
        Ok(())
    }
}

/// Replace the literal missing-value sentinel with a proper null, and cast a
/// column to Float64 when every remaining value is numeric.
fn normalize_sentinels(df: &mut DataFrame) -> Result<()> {
    let string_cols: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| c.name().to_string())
        .collect();

    for name in string_cols {
        let col = df.column(&name)?;
        let ca = col.str()?;

        let cleaned: Vec<Option<&str>> = ca
            .into_iter()
            .map(|v| v.filter(|s| *s != MISSING_SENTINEL))
            .collect();

        let all_numeric = cleaned
            .iter()
            .flatten()
            .all(|s| s.parse::<f64>().is_ok());
        let has_values = cleaned.iter().flatten().next().is_some();

        let replacement = if all_numeric && has_values {
            let vals: Vec<Option<f64>> = cleaned
                .iter()
                .map(|v| v.and_then(|s| s.parse::<f64>().ok()))
                .collect();
            Series::new(name.as_str().into(), vals)
        } else {
            let vals: Vec<Option<String>> =
                cleaned.iter().map(|v| v.map(|s| s.to_string())).collect();
            Series::new(name.as_str().into(), vals)
        };
        df.replace(&name, replacement)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunContext;
    use crate::store::JsonDocumentStore;

    fn seeded_store(rows: usize) -> (tempfile::TempDir, JsonDocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let coll_dir = dir.path().join("netguard");
        std::fs::create_dir_all(&coll_dir).unwrap();

        let records: Vec<String> = (0..rows)
            .map(|i| {
                format!(
                    r#"{{"_id": "{i}", "f1": {}, "f2": "{}", "Result": {}}}"#,
                    i,
                    if i == 0 { "na".to_string() } else { (i * 2).to_string() },
                    if i % 2 == 0 { 1 } else { -1 }
                )
            })
            .collect();
        std::fs::write(
            coll_dir.join("phishing.json"),
            format!("[{}]", records.join(",")),
        )
        .unwrap();

        let store = JsonDocumentStore::new(dir.path());
        (dir, store)
    }

    fn config_in(dir: &std::path::Path, ratio: f64) -> IngestionConfig {
        let ctx = RunContext::with_run_id("test_run").rooted_at(dir.join("artifacts"));
        IngestionConfig::new(&ctx, "netguard", "phishing").with_split_ratio(ratio)
    }

    #[test]
    fn test_split_counts_sum_and_match_ratio() {
        let (dir, store) = seeded_store(20);
        let config = config_in(dir.path(), 0.3);
        let artifact = DataIngestion::new(config).run(&store).unwrap();

        let train = persist::read_csv(&artifact.trained_file_path).unwrap();
        let test = persist::read_csv(&artifact.test_file_path).unwrap();

        assert_eq!(train.height() + test.height(), 20);
        assert!((test.height() as f64 - 20.0 * 0.3).abs() <= 1.0);
        // store id never reaches the partitions
        assert!(!train.get_column_names().iter().any(|n| n.as_str() == "_id"));
    }

    #[test]
    fn test_sentinel_becomes_null_and_column_goes_numeric() {
        let (dir, store) = seeded_store(10);
        let config = config_in(dir.path(), 0.3);
        let feature_store = config.feature_store_file_path.clone();
        DataIngestion::new(config).run(&store).unwrap();

        let snapshot = persist::read_csv(&feature_store).unwrap();
        let f2 = snapshot.column("f2").unwrap();
        // CSV round-trip re-infers the dtype; the point is it is no longer text
        assert_ne!(f2.dtype(), &DataType::String);
        assert_eq!(f2.null_count(), 1);
    }

    #[test]
    fn test_same_seed_reproduces_split() {
        let (dir, store) = seeded_store(12);
        let c1 = config_in(dir.path(), 0.25);
        let c2 = config_in(dir.path(), 0.25);
        let a1 = DataIngestion::new(c1).run(&store).unwrap();
        let a2 = DataIngestion::new(c2).run(&store).unwrap();

        let t1 = persist::read_csv(&a1.trained_file_path).unwrap();
        let t2 = persist::read_csv(&a2.trained_file_path).unwrap();
        assert!(t1.equals_missing(&t2));
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let (dir, store) = seeded_store(10);
        for ratio in [0.0, 1.0, 1.5, -0.1] {
            let config = config_in(dir.path(), ratio);
            assert!(DataIngestion::new(config).run(&store).is_err());
        }
    }
}
