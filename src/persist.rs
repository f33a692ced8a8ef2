//! Blob and tabular persistence helpers
//!
//! The binary mechanism (bincode) must be the structural inverse of itself:
//! any object graph saved here loads back structurally equal. CSV files carry
//! a header row and no row index.

use std::fs::File;
use std::path::Path;

use ndarray::Array2;
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Persist any serde-serializable object as a binary blob.
pub fn save_object<T: Serialize>(path: &Path, object: &T) -> Result<()> {
    ensure_parent(path)?;
    let bytes = bincode::serde::encode_to_vec(object, bincode::config::standard())?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Load a binary blob written by [`save_object`].
pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    let (object, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
    Ok(object)
}

/// Persist a dense matrix as a binary blob.
pub fn save_array(path: &Path, array: &Array2<f64>) -> Result<()> {
    save_object(path, array)
}

/// Load a dense matrix written by [`save_array`].
pub fn load_array(path: &Path) -> Result<Array2<f64>> {
    load_object(path)
}

/// Read a headered CSV file into a DataFrame.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Write a DataFrame as a headered CSV file, no row index.
pub fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    ensure_parent(path)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Write a serde-serializable value as a YAML document.
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let body = serde_yaml::to_string(value)?;
    std::fs::write(path, body)?;
    Ok(())
}
