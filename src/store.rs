//! Document store access
//!
//! The pipeline treats the store as a collection-oriented read interface:
//! database name + collection name in, uniform tabular data out. Connections
//! are scoped to the single fetch that needs them and never held as stage
//! state.

use std::path::PathBuf;

use polars::prelude::*;
use serde_json::Value;
use tracing::info;

use crate::error::{NetGuardError, Result};

/// Collection-oriented read interface over a document store.
pub trait DocumentStore {
    /// Fetch a full collection as a DataFrame, rows in stored order.
    fn fetch_collection(&self, database: &str, collection: &str) -> Result<DataFrame>;
}

/// Store backed by JSON files on the local file system.
///
/// A collection lives at `<root>/<database>/<collection>.json` as a JSON
/// array of flat records.
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    root: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build a store from the `NETGUARD_STORE_DIR` environment variable.
    pub fn from_env() -> Result<Self> {
        let root = std::env::var("NETGUARD_STORE_DIR")
            .map_err(|_| NetGuardError::Store("NETGUARD_STORE_DIR is not set".to_string()))?;
        Ok(Self::new(root))
    }
}

impl DocumentStore for JsonDocumentStore {
    fn fetch_collection(&self, database: &str, collection: &str) -> Result<DataFrame> {
        let path = self.root.join(database).join(format!("{collection}.json"));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            NetGuardError::Store(format!("cannot read collection {}: {e}", path.display()))
        })?;
        let records: Vec<Value> = serde_json::from_str(&raw)
            .map_err(|e| NetGuardError::Store(format!("malformed collection document: {e}")))?;

        let df = records_to_dataframe(&records)?;
        info!(
            database,
            collection,
            rows = df.height(),
            columns = df.width(),
            "fetched collection"
        );
        Ok(df)
    }
}

/// Convert an ordered set of flat JSON records into a DataFrame.
///
/// Column order follows first appearance across records. A column whose
/// non-null values are all integers becomes Int64, all-numeric becomes
/// Float64, anything else becomes a string column.
fn records_to_dataframe(records: &[Value]) -> Result<DataFrame> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        let obj = record
            .as_object()
            .ok_or_else(|| NetGuardError::Store("collection record is not an object".to_string()))?;
        for key in obj.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(names.len());
    for name in &names {
        let cells: Vec<Option<&Value>> = records
            .iter()
            .map(|r| r.get(name).filter(|v| !v.is_null()))
            .collect();
        columns.push(column_from_cells(name, &cells));
    }

    DataFrame::new(columns).map_err(Into::into)
}

fn column_from_cells(name: &str, cells: &[Option<&Value>]) -> Column {
    let all_int = cells
        .iter()
        .flatten()
        .all(|v| v.as_i64().is_some());
    if all_int && cells.iter().flatten().next().is_some() {
        let vals: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(|v| v.as_i64())).collect();
        return Series::new(name.into(), vals).into_column();
    }

    let all_num = cells.iter().flatten().all(|v| v.as_f64().is_some());
    if all_num && cells.iter().flatten().next().is_some() {
        let vals: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|v| v.as_f64())).collect();
        return Series::new(name.into(), vals).into_column();
    }

    let vals: Vec<Option<String>> = cells
        .iter()
        .map(|c| {
            c.map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .collect();
    Series::new(name.into(), vals).into_column()
}
