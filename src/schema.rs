//! Declarative column schema
//!
//! Loaded from a YAML document with two required keys: `columns` (ordered
//! name/type declarations, length used for count matching) and
//! `numerical_columns` (names expected to carry a numeric dtype at runtime).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};

/// One declared column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub dtype: String,
}

/// Expected shape of the source dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSchema {
    pub columns: Vec<ColumnSpec>,
    pub numerical_columns: Vec<String>,
}

impl DataSchema {
    /// Load the schema from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NetGuardError::Schema(format!("cannot read schema file {}: {e}", path.display()))
        })?;
        let schema: DataSchema = serde_yaml::from_str(&raw)
            .map_err(|e| NetGuardError::Schema(format!("malformed schema file: {e}")))?;
        if schema.columns.is_empty() {
            return Err(NetGuardError::Schema(
                "schema declares no columns".to_string(),
            ));
        }
        Ok(schema)
    }

    /// Number of columns a partition must have.
    pub fn expected_column_count(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_schema(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("schema.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_schema_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(
            dir.path(),
            "columns:\n  - name: f1\n    type: int64\n  - name: Result\n    type: int64\nnumerical_columns:\n  - f1\n",
        );
        let schema = DataSchema::from_yaml_file(&path).unwrap();
        assert_eq!(schema.expected_column_count(), 2);
        assert_eq!(schema.numerical_columns, vec!["f1"]);
    }

    #[test]
    fn test_empty_schema_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(dir.path(), "columns: []\nnumerical_columns: []\n");
        assert!(DataSchema::from_yaml_file(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_schema_error() {
        let err = DataSchema::from_yaml_file(Path::new("does/not/exist.yaml")).unwrap_err();
        assert!(matches!(err, NetGuardError::Schema(_)));
    }
}
