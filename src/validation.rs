//! Data validation stage
//!
//! Schema checks (column count, numeric-column presence) plus per-column
//! two-sample Kolmogorov-Smirnov drift detection between the train and test
//! partitions. Schema failures make the verdict negative and the orchestrator
//! aborts on them; drift is recorded in the report and flagged on the
//! artifact but does not by itself stop the run.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::{IngestionArtifact, ValidationArtifact};
use crate::config::ValidationConfig;
use crate::error::{NetGuardError, Result};
use crate::persist;
use crate::schema::DataSchema;

/// Drift verdict for one column
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriftEntry {
    pub p_value: f64,
    pub drift_status: bool,
}

/// Per-column drift report, keyed by column name
pub type DriftReport = BTreeMap<String, DriftEntry>;

/// Two-sample Kolmogorov-Smirnov test.
///
/// Returns the KS statistic and the asymptotic two-sided p-value.
pub fn ks_2samp(sample_a: &[f64], sample_b: &[f64]) -> Result<(f64, f64)> {
    if sample_a.is_empty() || sample_b.is_empty() {
        return Err(NetGuardError::Data(
            "KS test requires two non-empty samples".to_string(),
        ));
    }

    let mut a: Vec<f64> = sample_a.to_vec();
    let mut b: Vec<f64> = sample_b.to_vec();
    a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

    let ecdf = |sorted: &[f64], x: f64| -> f64 {
        let count = sorted.iter().filter(|&&v| v <= x).count();
        count as f64 / sorted.len() as f64
    };

    let mut combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    combined.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    combined.dedup();

    let statistic = combined
        .iter()
        .map(|&x| (ecdf(&a, x) - ecdf(&b, x)).abs())
        .fold(0.0, f64::max);

    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * statistic;

    Ok((statistic, kolmogorov_survival(lambda)))
}

/// Kolmogorov survival function Q(lambda), the asymptotic two-sided p-value.
///
/// Alternating series summed to convergence; a vanishing lambda means the
/// samples are indistinguishable and the survival probability is 1.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 1e-8 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut sign = 1.0;
    let mut sum = 0.0;
    let mut prev_term = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = sign * 2.0 * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= 0.001 * prev_term || term.abs() <= 1e-8 * sum.abs() {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        prev_term = term.abs();
    }
    // series failed to converge, treat as no evidence against equality
    1.0
}

pub struct DataValidation {
    ingestion_artifact: IngestionArtifact,
    config: ValidationConfig,
    schema: DataSchema,
}

impl DataValidation {
    pub fn new(ingestion_artifact: IngestionArtifact, config: ValidationConfig) -> Result<Self> {
        let schema = DataSchema::from_yaml_file(&config.schema_file_path)?;
        Ok(Self {
            ingestion_artifact,
            config,
            schema,
        })
    }

    /// Column count must equal the schema-declared count.
    fn validate_column_count(&self, df: &DataFrame) -> bool {
        df.width() == self.schema.expected_column_count()
    }

    /// Every schema-declared numeric column must be numeric at runtime.
    fn validate_numerical_columns(&self, df: &DataFrame) -> bool {
        self.schema.numerical_columns.iter().all(|name| {
            df.column(name)
                .map(|c| is_numeric_dtype(c.dtype()))
                .unwrap_or(false)
        })
    }

    /// KS-test every train column against its test counterpart.
    fn detect_drift(&self, train: &DataFrame, test: &DataFrame) -> Result<(bool, DriftReport)> {
        let mut report = DriftReport::new();
        let mut drift_anywhere = false;

        for name in train.get_column_names() {
            let d1 = column_values(train, name.as_str())?;
            let d2 = column_values(test, name.as_str())?;
            let (_, p_value) = ks_2samp(&d1, &d2)?;

            let drift_status = p_value < self.config.drift_threshold;
            drift_anywhere |= drift_status;
            report.insert(name.to_string(), DriftEntry { p_value, drift_status });
        }

        persist::write_yaml(&self.config.drift_report_file_path, &report)?;
        Ok((drift_anywhere, report))
    }

    pub fn run(&self) -> Result<ValidationArtifact> {
        let mut train = persist::read_csv(&self.ingestion_artifact.trained_file_path)?;
        let mut test = persist::read_csv(&self.ingestion_artifact.test_file_path)?;

        let mut schema_ok = true;
        for (label, df) in [("train", &train), ("test", &test)] {
            if !self.validate_column_count(df) {
                warn!(
                    partition = label,
                    expected = self.schema.expected_column_count(),
                    actual = df.width(),
                    "column count mismatch"
                );
                schema_ok = false;
            }
            if !self.validate_numerical_columns(df) {
                warn!(partition = label, "declared numerical columns missing or non-numeric");
                schema_ok = false;
            }
        }

        let (drift_detected, _) = self.detect_drift(&train, &test)?;
        if drift_detected {
            warn!("distribution drift detected between train and test partitions");
        }

        // Valid copies are always written; the orchestrator decides on the
        // verdict. (The reference skipped the copies whenever drift was
        // flagged while still reporting the source paths as valid.)
        persist::write_csv(&self.config.valid_train_file_path, &mut train)?;
        persist::write_csv(&self.config.valid_test_file_path, &mut test)?;

        info!(schema_ok, drift_detected, "data validation finished");
        Ok(ValidationArtifact {
            validation_status: schema_ok,
            drift_detected,
            valid_train_file_path: self.config.valid_train_file_path.clone(),
            valid_test_file_path: self.config.valid_test_file_path.clone(),
            drift_report_file_path: self.config.drift_report_file_path.clone(),
        })
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df
        .column(name)
        .map_err(|_| NetGuardError::Data(format!("column {name} missing from partition")))?;
    let values: Vec<f64> = col
        .cast(&DataType::Float64)
        .map_err(|_| NetGuardError::Data(format!("column {name} is not numeric")))?
        .f64()?
        .into_iter()
        .flatten()
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_identical_samples_show_no_drift() {
        let a: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let (stat, p) = ks_2samp(&a, &a).unwrap();
        assert_eq!(stat, 0.0);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_constant_columns_show_no_drift() {
        // A zero statistic must not collapse the survival series
        let a = vec![1.0; 30];
        let b = vec![1.0; 12];
        let (stat, p) = ks_2samp(&a, &b).unwrap();
        assert_eq!(stat, 0.0);
        assert!(p >= 0.05);
    }

    #[test]
    fn test_disjoint_supports_always_drift() {
        let a: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..30).map(|i| 1000.0 + i as f64).collect();
        let (stat, p) = ks_2samp(&a, &b).unwrap();
        assert_eq!(stat, 1.0);
        assert!(p < 0.05);
    }

    #[test]
    fn test_same_distribution_rarely_flags_drift() {
        // Identical distributions should stay below the threshold in the
        // vast majority of trials.
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut flagged = 0;
        let trials = 40;
        for _ in 0..trials {
            let a: Vec<f64> = (0..80).map(|_| rng.gen::<f64>()).collect();
            let b: Vec<f64> = (0..80).map(|_| rng.gen::<f64>()).collect();
            let (_, p) = ks_2samp(&a, &b).unwrap();
            if p < 0.05 {
                flagged += 1;
            }
        }
        assert!(flagged <= trials / 10);
    }

    #[test]
    fn test_empty_sample_rejected() {
        assert!(ks_2samp(&[], &[1.0]).is_err());
    }

    #[test]
    fn test_column_count_must_match_exactly() {
        use crate::config::RunContext;
        use crate::schema::ColumnSpec;

        let spec = |name: &str| ColumnSpec {
            name: name.to_string(),
            dtype: "int64".to_string(),
        };
        let ctx = RunContext::with_run_id("count_check");
        let stage = DataValidation {
            ingestion_artifact: IngestionArtifact {
                trained_file_path: "train.csv".into(),
                test_file_path: "test.csv".into(),
            },
            config: ValidationConfig::new(&ctx),
            schema: DataSchema {
                columns: vec![spec("f1"), spec("f2"), spec("Result")],
                numerical_columns: vec![],
            },
        };

        let exact = df!("f1" => &[1i64], "f2" => &[2i64], "Result" => &[1i64]).unwrap();
        let narrow = df!("f1" => &[1i64], "Result" => &[1i64]).unwrap();
        let wide = df!(
            "f1" => &[1i64],
            "f2" => &[2i64],
            "f3" => &[3i64],
            "Result" => &[1i64]
        )
        .unwrap();

        assert!(stage.validate_column_count(&exact));
        assert!(!stage.validate_column_count(&narrow));
        assert!(!stage.validate_column_count(&wide));
    }
}
