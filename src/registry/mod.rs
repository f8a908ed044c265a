//! Disease registry: one descriptor per supported disease dataset.
//!
//! A [`DiseaseDescriptor`] carries everything that varies between diseases
//! (source file, target rule, categorical encodings, sentinel row filters,
//! trainer iteration cap) so a single generic pipeline can process all of
//! them without per-disease driver code.

pub mod factory;

pub use factory::{all_descriptors, descriptor_from_key};

/// How the binary training label is derived from a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRule {
    /// An existing column holds the label directly
    Column {
        /// Name of the label column
        name: &'static str,
    },
    /// The label is 1 when any of the named binary flag columns is set
    AnyFlag {
        /// Display name of the derived label
        name: &'static str,
        /// Flag columns combined with a logical OR
        columns: &'static [&'static str],
    },
}

impl TargetRule {
    /// Columns consumed by this rule; none of them appear in the feature set
    #[must_use]
    pub fn consumed_columns(&self) -> &[&'static str] {
        match self {
            Self::Column { name } => std::slice::from_ref(name),
            Self::AnyFlag { columns, .. } => columns,
        }
    }

    /// Display name of the label
    #[must_use]
    pub fn label_name(&self) -> &'static str {
        match self {
            Self::Column { name } | Self::AnyFlag { name, .. } => *name,
        }
    }
}

/// One-hot encoding rule for a categorical column.
///
/// The level vocabulary is fixed globally per disease so that every
/// custodian exports the identical feature schema regardless of which
/// levels its own partition happens to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoricalEncoding {
    /// Column to encode
    pub column: &'static str,
    /// Ordered level vocabulary; produces one `<column>_<level>` feature each
    pub levels: &'static [&'static str],
}

/// Disease-specific row filter applied during cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    /// Drop rows whose value in `column` case-insensitively equals `value`
    ExcludeValue {
        column: &'static str,
        value: &'static str,
    },
}

/// Static description of one disease dataset and its processing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseaseDescriptor {
    /// Canonical key, e.g. `diabetes`
    pub key: &'static str,
    /// Human-readable name for logs
    pub display_name: &'static str,
    /// File name under the raw data directory
    pub source_file: &'static str,
    /// Label derivation; `None` means the disease is split but not trained
    pub target: Option<TargetRule>,
    /// One-hot encodings applied to categorical feature columns
    pub categorical: &'static [CategoricalEncoding],
    /// Columns excluded from the feature set in addition to the target's own
    pub excluded_features: &'static [&'static str],
    /// Sentinel row filters applied during cleaning
    pub row_filters: &'static [RowFilter],
    /// Iteration cap for the logistic trainer
    pub max_iter: usize,
    /// Whether a stratified holdout split is taken before fitting
    pub holdout: bool,
}

impl DiseaseDescriptor {
    /// Whether a trainer exists for this disease
    #[must_use]
    pub fn trainable(&self) -> bool {
        self.target.is_some()
    }
}

/// One of the simulated data-holding sites
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Custodian {
    display_name: String,
}

impl Custodian {
    /// Create a custodian from its display name, e.g. `Hospital A`
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }

    /// Display name used for the partition directory and the artifact's
    /// `hospital` field
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// File-system key: lowercased display name with spaces replaced by
    /// underscores, e.g. `hospital_a`
    #[must_use]
    pub fn key(&self) -> String {
        self.display_name.to_lowercase().replace(' ', "_")
    }
}

impl std::fmt::Display for Custodian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// The default custodian list
#[must_use]
pub fn default_custodians() -> Vec<Custodian> {
    ["Hospital A", "Hospital B", "Hospital C"]
        .into_iter()
        .map(Custodian::new)
        .collect()
}
