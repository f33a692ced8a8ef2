//! Data transformation stage
//!
//! Turns the validated CSV partitions into dense numeric matrices: splits off
//! the target column, recodes the -1 feature indicators to 0, imputes missing
//! feature cells with the KNN preprocessor, and persists the matrices
//! together with the fitted preprocessor. The matrices carry the target as
//! their final column, with its original labels.

use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;

use tracing::info;

use crate::artifact::{TransformationArtifact, ValidationArtifact};
use crate::config::{FitSource, TransformationConfig, TARGET_COLUMN};
use crate::error::{NetGuardError, Result};
use crate::imputation::{KnnImputer, Preprocessor};
use crate::persist;

pub struct DataTransformation {
    validation_artifact: ValidationArtifact,
    config: TransformationConfig,
}

impl DataTransformation {
    pub fn new(validation_artifact: ValidationArtifact, config: TransformationConfig) -> Self {
        Self {
            validation_artifact,
            config,
        }
    }

    pub fn run(&self) -> Result<TransformationArtifact> {
        let train = persist::read_csv(&self.validation_artifact.valid_train_file_path)?;
        let test = persist::read_csv(&self.validation_artifact.valid_test_file_path)?;

        let (x_train, y_train) = split_features_target(&train)?;
        let (x_test, y_test) = split_features_target(&test)?;

        let mut preprocessor = Preprocessor::new(
            KnnImputer::new(self.config.imputer_neighbors)
                .with_weights(self.config.imputer_weights),
        );
        match self.config.fit_source {
            FitSource::Train => preprocessor.fit(&x_train)?,
            FitSource::Test => preprocessor.fit(&x_test)?,
        }

        let x_train = preprocessor.transform(&x_train)?;
        let x_test = preprocessor.transform(&x_test)?;

        let train_matrix = append_target(&x_train, &y_train)?;
        let test_matrix = append_target(&x_test, &y_test)?;

        persist::save_array(&self.config.transformed_train_file_path, &train_matrix)?;
        persist::save_array(&self.config.transformed_test_file_path, &test_matrix)?;
        persist::save_object(&self.config.transformed_object_file_path, &preprocessor)?;

        info!(
            train_rows = train_matrix.nrows(),
            test_rows = test_matrix.nrows(),
            features = x_train.ncols(),
            "data transformation finished"
        );
        Ok(TransformationArtifact {
            transformed_train_file_path: self.config.transformed_train_file_path.clone(),
            transformed_test_file_path: self.config.transformed_test_file_path.clone(),
            transformed_object_file_path: self.config.transformed_object_file_path.clone(),
        })
    }
}

/// Split a partition into a feature matrix and its target vector.
///
/// The source encodes feature indicators as -1/0/1; the -1 values become 0
/// so every feature is a 0/1 indicator. Nulls become NaN for the imputer.
/// The target keeps its original labels.
fn split_features_target(df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
    let target = df
        .column(TARGET_COLUMN)
        .map_err(|_| NetGuardError::Data(format!("target column {TARGET_COLUMN} missing")))?;
    let y: Vec<f64> = target
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                NetGuardError::Data("target column contains missing values".to_string())
            })
        })
        .collect::<Result<_>>()?;

    let features = df.drop(TARGET_COLUMN)?;
    let n_rows = features.height();
    let n_cols = features.width();
    let mut x = Array2::zeros((n_rows, n_cols));
    for (j, col) in features.get_columns().iter().enumerate() {
        let ca = col.cast(&DataType::Float64).map_err(|_| {
            NetGuardError::Data(format!("feature column {} is not numeric", col.name()))
        })?;
        for (i, v) in ca.f64()?.into_iter().enumerate() {
            x[[i, j]] = match v {
                Some(v) if v == -1.0 => 0.0,
                Some(v) => v,
                None => f64::NAN,
            };
        }
    }

    Ok((x, Array1::from_vec(y)))
}

/// Combined matrix with the target appended as the last column.
fn append_target(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
    if x.nrows() != y.len() {
        return Err(NetGuardError::Shape {
            expected: format!("{} rows", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    let y_col = y
        .clone()
        .into_shape_with_order((y.len(), 1))
        .map_err(|e| NetGuardError::Data(e.to_string()))?;
    ndarray::concatenate(Axis(1), &[x.view(), y_col.view()])
        .map_err(|e| NetGuardError::Data(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_partition(path: &Path, with_missing: bool) {
        let body = if with_missing {
            "f1,f2,Result\n5.0,-1,1\n,1,-1\n6.0,-1,1\n4.0,0,-1\n5.5,1,1\n6.5,-1,-1\n"
        } else {
            "f1,f2,Result\n5.0,-1,1\n5.5,1,-1\n6.0,-1,1\n4.0,0,-1\n5.5,1,1\n6.5,-1,-1\n"
        };
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn stage_in(dir: &Path) -> (DataTransformation, TransformationConfig) {
        let ctx = crate::config::RunContext::with_run_id("t_run").rooted_at(dir.join("artifacts"));
        let config = TransformationConfig::new(&ctx);

        let train_path = dir.join("valid/train.csv");
        let test_path = dir.join("valid/test.csv");
        write_partition(&train_path, true);
        write_partition(&test_path, false);

        let artifact = ValidationArtifact {
            validation_status: true,
            drift_detected: false,
            valid_train_file_path: train_path,
            valid_test_file_path: test_path,
            drift_report_file_path: dir.join("report.yaml"),
        };
        (DataTransformation::new(artifact, config.clone()), config)
    }

    #[test]
    fn test_matrices_are_dense_with_recoded_features() {
        let dir = tempfile::tempdir().unwrap();
        let (stage, config) = stage_in(dir.path());
        stage.run().unwrap();

        let train = persist::load_array(&config.transformed_train_file_path).unwrap();
        assert_eq!(train.ncols(), 3);
        assert!(!train.iter().any(|v| v.is_nan()));
        // -1 indicators become 0 in the feature block only
        let last = train.ncols() - 1;
        for row in train.rows() {
            for &v in row.iter().take(last) {
                assert_ne!(v, -1.0);
            }
        }
        // the target column keeps its original -1/1 labels
        for &v in train.column(last) {
            assert!(v == -1.0 || v == 1.0);
        }
    }

    #[test]
    fn test_persisted_preprocessor_is_fitted() {
        let dir = tempfile::tempdir().unwrap();
        let (stage, config) = stage_in(dir.path());
        stage.run().unwrap();

        let pre: Preprocessor =
            persist::load_object(&config.transformed_object_file_path).unwrap();
        assert!(pre.is_fitted());
    }

    #[test]
    fn test_fit_source_changes_the_fit_partition() {
        // With disjoint partitions, imputed values betray which side was fit.
        let dir = tempfile::tempdir().unwrap();
        let train_path = dir.path().join("train.csv");
        let test_path = dir.path().join("test.csv");
        std::fs::write(
            &train_path,
            "f1,f2,Result\n1.0,1.0,1\n1.0,1.0,-1\n,1.0,1\n1.0,1.0,-1\n",
        )
        .unwrap();
        std::fs::write(
            &test_path,
            "f1,f2,Result\n9.0,1.0,1\n9.0,1.0,-1\n9.0,1.0,1\n9.0,1.0,-1\n",
        )
        .unwrap();

        let artifact = ValidationArtifact {
            validation_status: true,
            drift_detected: false,
            valid_train_file_path: train_path,
            valid_test_file_path: test_path,
            drift_report_file_path: dir.path().join("report.yaml"),
        };

        let ctx_a = crate::config::RunContext::with_run_id("a").rooted_at(dir.path().join("arts"));
        let config_a = TransformationConfig::new(&ctx_a);
        DataTransformation::new(artifact.clone(), config_a.clone())
            .run()
            .unwrap();
        let from_train = persist::load_array(&config_a.transformed_train_file_path).unwrap();

        let ctx_b = crate::config::RunContext::with_run_id("b").rooted_at(dir.path().join("arts"));
        let config_b = TransformationConfig::new(&ctx_b).with_fit_source(FitSource::Test);
        DataTransformation::new(artifact, config_b.clone())
            .run()
            .unwrap();
        let from_test = persist::load_array(&config_b.transformed_train_file_path).unwrap();

        assert_eq!(from_train[[2, 0]], 1.0);
        assert_eq!(from_test[[2, 0]], 9.0);
    }

    #[test]
    fn test_missing_target_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("f1" => &[1.0f64, 2.0]).unwrap();
        assert!(split_features_target(&df).is_err());
    }
}
