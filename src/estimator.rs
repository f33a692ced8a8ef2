//! Inference bundle
//!
//! The deployable unit: exactly one fitted preprocessor and one fitted model,
//! persisted together so the predict-time transform is the bit-identical fit
//! that produced the training data.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{NetGuardError, Result};
use crate::imputation::Preprocessor;
use crate::models::{CandidateModel, Classifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    preprocessor: Preprocessor,
    model: CandidateModel,
}

impl NetworkModel {
    pub fn new(preprocessor: Preprocessor, model: CandidateModel) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    /// Transform raw features, then predict on the transformed matrix.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.preprocessor.is_fitted() {
            return Err(NetGuardError::ModelNotFitted);
        }
        let transformed = self.preprocessor.transform(x)?;
        self.model.predict(&transformed)
    }
}
