//! Batch orchestration: split every disease across custodians, then train
//! and export one model per (disease, custodian) unit.
//!
//! Units are isolated: a missing file logs a warning and the batch
//! continues, and a schema or data failure aborts only its own unit. Every
//! unit writes to a distinct output path, so the training fan-out needs no
//! synchronization.

use std::path::PathBuf;

use itertools::Itertools;
use log::{error, info, warn};
use rayon::prelude::*;

use crate::clean::clean;
use crate::config::PipelineConfig;
use crate::encode::encode;
use crate::error::{PipelineError, Result};
use crate::export::WeightArtifact;
use crate::model::{TrainConfig, train_site};
use crate::registry::{Custodian, DiseaseDescriptor, all_descriptors};
use crate::split::partition_and_save;
use crate::table::read_csv;
use crate::utils::progress;

/// How one batch unit ended
#[derive(Debug)]
pub enum UnitStatus {
    /// Unit completed
    Done,
    /// Input file missing; unit skipped
    SkippedMissing(PathBuf),
    /// Disease has no trainer; unit skipped
    SkippedUntrainable,
    /// Unit aborted
    Failed(PipelineError),
}

/// Report for one (disease, custodian) unit, or one per-disease split
#[derive(Debug)]
pub struct UnitReport {
    /// Disease key
    pub disease: &'static str,
    /// Custodian display name; `None` for split units
    pub custodian: Option<String>,
    /// How the unit ended
    pub status: UnitStatus,
}

/// Aggregated outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Per-unit reports in execution order
    pub reports: Vec<UnitReport>,
}

impl BatchSummary {
    /// Number of completed units
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Done))
    }

    /// Number of skipped units (missing inputs or untrainable diseases)
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|s| {
            matches!(
                s,
                UnitStatus::SkippedMissing(_) | UnitStatus::SkippedUntrainable
            )
        })
    }

    /// Number of failed units
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Failed(_)))
    }

    fn count(&self, matcher: impl Fn(&UnitStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| matcher(&r.status)).count()
    }

    /// Log one line per failed unit plus the overall counts
    pub fn log(&self) {
        for report in &self.reports {
            if let UnitStatus::Failed(e) = &report.status {
                let custodian = report.custodian.as_deref().unwrap_or("-");
                warn!("Unit {} / {custodian} failed: {e}", report.disease);
            }
        }
        info!(
            "Batch finished: {} completed, {} skipped, {} failed",
            self.completed(),
            self.skipped(),
            self.failed()
        );
    }

    fn merge(mut self, other: Self) -> Self {
        self.reports.extend(other.reports);
        self
    }
}

/// Split one disease's raw dataset into per-custodian partitions
///
/// Runs load, clean and partition-persist in order and returns the
/// partition sizes in custodian order.
///
/// # Errors
/// Returns an error if loading, cleaning or persistence fails
pub fn split_disease(
    disease: &DiseaseDescriptor,
    custodians: &[Custodian],
    config: &PipelineConfig,
) -> Result<Vec<usize>> {
    let raw = read_csv(&config.raw_path(disease))?;
    let cleaned = clean(&raw, disease, config.prune_threshold)?;
    partition_and_save(&cleaned, disease, custodians, config)
}

/// Split every disease, isolating failures per disease
#[must_use]
pub fn split_all(custodians: &[Custodian], config: &PipelineConfig) -> BatchSummary {
    let mut reports = Vec::new();

    for disease in all_descriptors() {
        let path = config.raw_path(disease);
        if !path.exists() {
            warn!(
                "Missing source file for {}: {}",
                disease.key,
                path.display()
            );
            reports.push(UnitReport {
                disease: disease.key,
                custodian: None,
                status: UnitStatus::SkippedMissing(path),
            });
            continue;
        }

        let status = match split_disease(disease, custodians, config) {
            Ok(_) => UnitStatus::Done,
            Err(e) => {
                error!("Splitting {} failed: {e}", disease.key);
                UnitStatus::Failed(e)
            }
        };
        reports.push(UnitReport {
            disease: disease.key,
            custodian: None,
            status,
        });
    }

    BatchSummary { reports }
}

/// Train and export one custodian's model for one disease
///
/// Returns the path of the written weight artifact.
///
/// # Errors
/// Returns an error if the partition cannot be read, encoded, fitted or
/// exported
pub fn train_partition(
    disease: &DiseaseDescriptor,
    custodian: &Custodian,
    config: &PipelineConfig,
) -> Result<PathBuf> {
    info!("Training {} model for {custodian}", disease.display_name);

    let partition = read_csv(&config.partition_path(custodian, disease))?;
    let encoded = encode(&partition, disease)?;

    let site = train_site(&encoded, &TrainConfig::for_disease(config, disease))?;
    if let Some(accuracy) = site.holdout_accuracy {
        info!(
            "{} / {}: holdout accuracy {accuracy:.3}",
            disease.key,
            custodian.key()
        );
    }

    let artifact = WeightArtifact::from_site_model(&site, custodian);
    let path = config.artifact_path(disease, custodian);
    artifact.save(&path)?;
    Ok(path)
}

fn train_unit(
    disease: &DiseaseDescriptor,
    custodian: &Custodian,
    config: &PipelineConfig,
) -> UnitReport {
    let custodian_name = Some(custodian.display_name().to_string());

    if !disease.trainable() {
        info!("No trainer for {}; skipping {custodian}", disease.key);
        return UnitReport {
            disease: disease.key,
            custodian: custodian_name,
            status: UnitStatus::SkippedUntrainable,
        };
    }

    let partition = config.partition_path(custodian, disease);
    if !partition.exists() {
        warn!(
            "Missing partition for {} / {custodian}: {}",
            disease.key,
            partition.display()
        );
        return UnitReport {
            disease: disease.key,
            custodian: custodian_name,
            status: UnitStatus::SkippedMissing(partition),
        };
    }

    let status = match train_partition(disease, custodian, config) {
        Ok(_) => UnitStatus::Done,
        Err(e) if e.is_not_found() => {
            warn!("Input disappeared for {} / {custodian}: {e}", disease.key);
            UnitStatus::SkippedMissing(partition)
        }
        Err(e) => {
            error!("Training {} for {custodian} failed: {e}", disease.key);
            UnitStatus::Failed(e)
        }
    };
    UnitReport {
        disease: disease.key,
        custodian: custodian_name,
        status,
    }
}

/// Train every custodian of one disease sequentially
#[must_use]
pub fn train_disease(
    disease: &DiseaseDescriptor,
    custodians: &[Custodian],
    config: &PipelineConfig,
) -> BatchSummary {
    BatchSummary {
        reports: custodians
            .iter()
            .map(|custodian| train_unit(disease, custodian, config))
            .collect(),
    }
}

/// Train every (disease, custodian) unit, fanned out on a rayon pool
#[must_use]
pub fn train_all(custodians: &[Custodian], config: &PipelineConfig) -> BatchSummary {
    let units = all_descriptors()
        .iter()
        .cartesian_product(custodians.iter())
        .collect_vec();

    let threads = num_cpus::get().min(units.len()).max(1);
    info!(
        "Training {} units on {threads} worker threads",
        units.len()
    );
    let pb = progress::create_progress_bar(units.len() as u64, Some("Training site models"));

    let run_unit = |unit: &(&DiseaseDescriptor, &Custodian)| -> UnitReport {
        let report = train_unit(unit.0, unit.1, config);
        pb.inc(1);
        report
    };

    let reports: Vec<UnitReport> = match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
    {
        Ok(pool) => pool.install(|| units.par_iter().map(run_unit).collect()),
        Err(e) => {
            warn!("Thread pool unavailable, training sequentially: {e}");
            units.iter().map(run_unit).collect()
        }
    };

    progress::finish_progress_bar(&pb, Some("Training complete"));
    BatchSummary { reports }
}

/// Run the full batch: split every disease, then train every unit
#[must_use]
pub fn run_all(custodians: &[Custodian], config: &PipelineConfig) -> BatchSummary {
    split_all(custodians, config).merge(train_all(custodians, config))
}
