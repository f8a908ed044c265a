//! Configuration for the partitioning and training pipeline.

use std::path::{Path, PathBuf};

use crate::registry::{Custodian, DiseaseDescriptor};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory holding `raw/`, `hospital/` and `weights/`
    pub data_dir: PathBuf,
    /// Seed for the partition shuffle and the trainer's holdout split
    pub seed: u64,
    /// Number of custodian partitions per disease
    pub partitions: usize,
    /// Drop a column when its most frequent value covers more than this
    /// fraction of rows
    pub prune_threshold: f64,
    /// Fraction of a partition held out for evaluation (stratified by label)
    pub holdout_fraction: f64,
    /// Gradient-descent step size for the logistic trainer
    pub learning_rate: f64,
    /// L2 regularization strength
    pub l2_penalty: f64,
    /// Gradient tolerance below which the trainer stops early
    pub tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            seed: 42,
            partitions: 3,
            prune_threshold: 0.95,
            holdout_fraction: 0.2,
            learning_rate: 0.1,
            l2_penalty: 1.0,
            tolerance: 1e-4,
        }
    }
}

impl PipelineConfig {
    /// Directory holding the raw per-disease CSV files
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Directory holding the per-custodian partition files
    #[must_use]
    pub fn hospital_dir(&self) -> PathBuf {
        self.data_dir.join("hospital")
    }

    /// Directory holding the exported weight artifacts
    #[must_use]
    pub fn weights_dir(&self) -> PathBuf {
        self.data_dir.join("weights")
    }

    /// Path to one disease's raw source file
    #[must_use]
    pub fn raw_path(&self, disease: &DiseaseDescriptor) -> PathBuf {
        self.raw_dir().join(disease.source_file)
    }

    /// Path to one custodian's partition of one disease,
    /// `data/hospital/<custodian display name>/<disease_key>.csv`
    #[must_use]
    pub fn partition_path(&self, custodian: &Custodian, disease: &DiseaseDescriptor) -> PathBuf {
        self.hospital_dir()
            .join(custodian.display_name())
            .join(format!("{}.csv", disease.key))
    }

    /// Path to one (disease, custodian) weight artifact,
    /// `data/weights/<disease_key>/<custodian_key>_weights.json`
    #[must_use]
    pub fn artifact_path(&self, disease: &DiseaseDescriptor, custodian: &Custodian) -> PathBuf {
        self.weights_dir()
            .join(disease.key)
            .join(format!("{}_weights.json", custodian.key()))
    }
}

/// Ensure a directory exists, creating it and its parents if needed
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
