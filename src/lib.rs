//! A Rust library for partitioning disease-diagnosis datasets across
//! simulated hospital sites and training per-site logistic-regression
//! models with a canonical weight-export schema.

pub mod clean;
pub mod config;
pub mod encode;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod split;
pub mod table;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use registry::{Custodian, DiseaseDescriptor, default_custodians, descriptor_from_key};

// Model and artifact types
pub use encode::{ClassLabel, EncodedMatrix};
pub use export::WeightArtifact;
pub use model::{LogisticModel, LogisticRegression, SiteModel};

// Batch entry points
pub use pipeline::{run_all, split_all, split_disease, train_all, train_disease, train_partition};

// Arrow types
pub use arrow::record_batch::RecordBatch;
