//! Weight artifact export.
//!
//! One JSON document per (disease, custodian) pair, in the schema the
//! downstream form consumer reads. The document is the only interface the
//! pipeline exposes outward; its field names and shapes are fixed.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::info;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::ensure_dir;
use crate::encode::ClassLabel;
use crate::error::{PipelineError, Result};
use crate::model::SiteModel;
use crate::registry::Custodian;

/// Model kind written into every artifact
pub const MODEL_KIND: &str = "logistic_regression";

/// Serialized parameters of one fitted site model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightArtifact {
    /// Model kind, always `logistic_regression`
    pub model: String,
    /// Custodian display name
    pub hospital: String,
    /// Ordered feature names matching the coefficient ordering
    pub features: Vec<String>,
    /// Coefficient matrix, shape `[1][n_features]` for a binary fit
    pub coef: Vec<Vec<f64>>,
    /// Intercept vector, one entry for a binary fit
    pub intercept: Vec<f64>,
    /// Ordered class labels, two entries for a binary fit
    pub classes: Vec<ClassLabel>,
}

impl WeightArtifact {
    /// Build the artifact for one fitted site model
    #[must_use]
    pub fn from_site_model(site: &SiteModel, custodian: &Custodian) -> Self {
        Self {
            model: MODEL_KIND.to_string(),
            hospital: custodian.display_name().to_string(),
            features: site.feature_names.clone(),
            coef: vec![site.model.weights.to_vec()],
            intercept: vec![site.model.intercept],
            classes: site.classes.clone(),
        }
    }

    /// Write the artifact as pretty-printed JSON, overwriting any existing
    /// document at the path
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or serialized
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        info!("Weights saved: {}", path.display());
        Ok(())
    }

    /// Load an artifact back from disk
    ///
    /// # Errors
    /// Returns an error if the file is missing or not a valid artifact
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let artifact: Self = serde_json::from_reader(file)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check the artifact's structural invariants
    ///
    /// # Errors
    /// Returns a `SchemaError` if shapes are inconsistent
    pub fn validate(&self) -> Result<()> {
        if self.coef.len() != 1 {
            return Err(PipelineError::schema(format!(
                "expected a [1][n] coefficient matrix, found {} rows",
                self.coef.len()
            )));
        }
        if self.coef[0].len() != self.features.len() {
            return Err(PipelineError::schema(format!(
                "{} coefficients for {} features",
                self.coef[0].len(),
                self.features.len()
            )));
        }
        if self.intercept.len() != 1 {
            return Err(PipelineError::schema(format!(
                "expected one intercept, found {}",
                self.intercept.len()
            )));
        }
        if self.classes.len() != 2 {
            return Err(PipelineError::schema(format!(
                "expected two class labels, found {}",
                self.classes.len()
            )));
        }
        Ok(())
    }

    /// Reconstruct the linear decision function `w·x + b` from the
    /// serialized parameters
    ///
    /// # Errors
    /// Returns a `SchemaError` if the matrix width does not match the
    /// feature list
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.validate()?;
        if x.ncols() != self.features.len() {
            return Err(PipelineError::schema(format!(
                "matrix has {} columns but the artifact lists {} features",
                x.ncols(),
                self.features.len()
            )));
        }
        let weights = Array1::from(self.coef[0].clone());
        Ok(x.dot(&weights) + self.intercept[0])
    }

    /// Predicted class labels recomputed from the serialized parameters
    ///
    /// # Errors
    /// Returns a `SchemaError` if shapes are inconsistent
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<ClassLabel>> {
        let decisions = self.decision_function(x)?;
        Ok(decisions
            .iter()
            .map(|&d| self.classes[usize::from(d >= 0.0)].clone())
            .collect())
    }
}
