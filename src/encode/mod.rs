//! Feature encoding: turns one custodian's cleaned partition into a
//! numeric matrix, a binary label vector and an ordered feature-name list.
//!
//! Feature order is significant: numeric columns appear first in table
//! order, then one `<column>_<level>` feature per level of each configured
//! categorical column, in descriptor order. The same order flows into the
//! trainer and the exported artifact.

use std::collections::BTreeSet;
use std::fmt;

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use log::warn;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::registry::{DiseaseDescriptor, TargetRule};

/// Errors produced while encoding a partition
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// A column the descriptor declares is absent from the partition
    #[error("column '{column}' not found in partition")]
    MissingColumn {
        /// The missing column
        column: String,
    },

    /// A column cannot be represented numerically
    #[error("column '{column}' cannot be encoded as numeric: {reason}")]
    NonNumeric {
        /// The offending column
        column: String,
        /// Why the column cannot be encoded
        reason: String,
    },

    /// The label column holds more distinct values than a binary fit allows
    #[error("target '{column}' has {count} distinct values; a binary fit needs 2")]
    ClassCount {
        /// The label column or derived label name
        column: String,
        /// Number of distinct values observed
        count: usize,
    },

    /// The partition has no rows
    #[error("partition is empty")]
    EmptyPartition,

    /// The descriptor declares no target rule
    #[error("disease has no target rule; nothing to encode a label from")]
    NoTarget,

    /// Internal shape mismatch while assembling the matrix
    #[error("shape error: {0}")]
    Shape(String),
}

/// A class label as it appears in the source data: an integer or a string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    /// Integer-coded label (e.g. `0` / `1`)
    Int(i64),
    /// String-coded label (e.g. `B` / `M`)
    Text(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// One custodian partition, encoded for training
#[derive(Debug, Clone)]
pub struct EncodedMatrix {
    /// Feature matrix, shape `(rows, features)`
    pub x: Array2<f64>,
    /// Label vector holding class indices (`0.0` / `1.0`)
    pub y: Array1<f64>,
    /// Ordered feature names matching the matrix columns
    pub feature_names: Vec<String>,
    /// Ordered distinct class labels; `y` holds indices into this list
    pub classes: Vec<ClassLabel>,
    /// Display name of the label
    pub label_name: String,
}

/// Encode one custodian's cleaned partition
///
/// # Errors
/// Returns an error if a declared column is missing, a feature column is
/// not numerically representable, or the label is not binary
pub fn encode(
    batch: &RecordBatch,
    disease: &DiseaseDescriptor,
) -> Result<EncodedMatrix, EncodeError> {
    let Some(target) = disease.target else {
        return Err(EncodeError::NoTarget);
    };
    let rows = batch.num_rows();
    if rows == 0 {
        return Err(EncodeError::EmptyPartition);
    }

    let (labels, label_name) = derive_labels(batch, &target)?;
    let classes: Vec<ClassLabel> = labels.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    if classes.len() > 2 {
        return Err(EncodeError::ClassCount {
            column: label_name.clone(),
            count: classes.len(),
        });
    }
    let y: Array1<f64> = labels
        .iter()
        .map(|label| classes.iter().position(|c| c == label).unwrap_or(0) as f64)
        .collect();

    // Columns that never become features: the label's sources, explicit
    // exclusions and the one-hot encoded columns themselves.
    let skip = |name: &str| -> bool {
        target.consumed_columns().contains(&name)
            || disease.excluded_features.contains(&name)
            || disease.categorical.iter().any(|c| c.column == name)
    };

    let mut numeric: SmallVec<[(usize, String); 16]> = SmallVec::new();
    for (idx, field) in batch.schema().fields().iter().enumerate() {
        let name = field.name().as_str();
        if skip(name) {
            continue;
        }
        match field.data_type() {
            dt if dt.is_numeric() || *dt == DataType::Boolean => {
                numeric.push((idx, name.to_string()));
            }
            DataType::Utf8 => {
                return Err(EncodeError::NonNumeric {
                    column: name.to_string(),
                    reason: "string column has no one-hot encoding configured".to_string(),
                });
            }
            other => {
                return Err(EncodeError::NonNumeric {
                    column: name.to_string(),
                    reason: format!("unsupported column type {other}"),
                });
            }
        }
    }

    let mut groups = Vec::with_capacity(disease.categorical.len());
    for encoding in disease.categorical {
        let Some((idx, _)) = batch.schema().column_with_name(encoding.column) else {
            return Err(EncodeError::MissingColumn {
                column: encoding.column.to_string(),
            });
        };
        let column = batch.column(idx).clone();
        if column.data_type() != &DataType::Utf8 {
            return Err(EncodeError::NonNumeric {
                column: encoding.column.to_string(),
                reason: format!(
                    "one-hot encoding expects a string column, found {}",
                    column.data_type()
                ),
            });
        }
        groups.push((encoding, column));
    }

    let n_features =
        numeric.len() + groups.iter().map(|(e, _)| e.levels.len()).sum::<usize>();
    let mut feature_names = Vec::with_capacity(n_features);
    feature_names.extend(numeric.iter().map(|(_, name)| name.clone()));
    for (encoding, _) in &groups {
        for level in encoding.levels {
            feature_names.push(format!("{}_{}", encoding.column, level));
        }
    }

    let mut data = vec![0.0_f64; rows * n_features];

    for (j, (idx, name)) in numeric.iter().enumerate() {
        let floats = cast(batch.column(*idx).as_ref(), &DataType::Float64)?;
        let floats = floats
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| EncodeError::NonNumeric {
                column: name.clone(),
                reason: "cast to Float64 failed".to_string(),
            })?;
        if floats.null_count() > 0 {
            return Err(EncodeError::NonNumeric {
                column: name.clone(),
                reason: "values not representable as numbers".to_string(),
            });
        }
        for row in 0..rows {
            data[row * n_features + j] = floats.value(row);
        }
    }

    let mut offset = numeric.len();
    for (encoding, column) in &groups {
        let strings = column
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| EncodeError::NonNumeric {
                column: encoding.column.to_string(),
                reason: "expected a string column".to_string(),
            })?;

        let mut unknown = 0_usize;
        for row in 0..rows {
            let value = strings.value(row);
            match encoding.levels.iter().position(|level| *level == value) {
                Some(k) => data[row * n_features + offset + k] = 1.0,
                // Levels outside the fixed vocabulary encode as all-zeros
                None => unknown += 1,
            }
        }
        if unknown > 0 {
            warn!(
                "{unknown} rows in column '{}' hold levels outside the fixed vocabulary",
                encoding.column
            );
        }
        offset += encoding.levels.len();
    }

    let x = Array2::from_shape_vec((rows, n_features), data)
        .map_err(|e| EncodeError::Shape(e.to_string()))?;

    Ok(EncodedMatrix {
        x,
        y,
        feature_names,
        classes,
        label_name,
    })
}

/// Extract per-row class labels according to the target rule
fn derive_labels(
    batch: &RecordBatch,
    target: &TargetRule,
) -> Result<(Vec<ClassLabel>, String), EncodeError> {
    let rows = batch.num_rows();
    match target {
        TargetRule::Column { name } => {
            let Some((idx, _)) = batch.schema().column_with_name(name) else {
                return Err(EncodeError::MissingColumn {
                    column: (*name).to_string(),
                });
            };
            let column = batch.column(idx);
            let labels = match column.data_type() {
                DataType::Utf8 => {
                    let strings = column
                        .as_any()
                        .downcast_ref::<StringArray>()
                        .ok_or_else(|| EncodeError::NonNumeric {
                            column: (*name).to_string(),
                            reason: "expected a string column".to_string(),
                        })?;
                    (0..rows)
                        .map(|row| ClassLabel::Text(strings.value(row).to_string()))
                        .collect()
                }
                dt if dt.is_numeric() || *dt == DataType::Boolean => {
                    let ints = cast(column.as_ref(), &DataType::Int64)?;
                    let ints = ints.as_any().downcast_ref::<Int64Array>().ok_or_else(|| {
                        EncodeError::NonNumeric {
                            column: (*name).to_string(),
                            reason: "cast to Int64 failed".to_string(),
                        }
                    })?;
                    (0..rows).map(|row| ClassLabel::Int(ints.value(row))).collect()
                }
                other => {
                    return Err(EncodeError::NonNumeric {
                        column: (*name).to_string(),
                        reason: format!("unsupported target type {other}"),
                    });
                }
            };
            Ok((labels, (*name).to_string()))
        }
        TargetRule::AnyFlag { name, columns } => {
            let mut flags = Vec::with_capacity(columns.len());
            for column_name in *columns {
                let Some((idx, _)) = batch.schema().column_with_name(column_name) else {
                    return Err(EncodeError::MissingColumn {
                        column: (*column_name).to_string(),
                    });
                };
                let floats = cast(batch.column(idx).as_ref(), &DataType::Float64)?;
                let floats = floats
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| EncodeError::NonNumeric {
                        column: (*column_name).to_string(),
                        reason: "cast to Float64 failed".to_string(),
                    })?
                    .clone();
                flags.push(floats);
            }

            let labels = (0..rows)
                .map(|row| {
                    let set = flags.iter().any(|f| !f.is_null(row) && f.value(row) != 0.0);
                    ClassLabel::Int(i64::from(set))
                })
                .collect();
            Ok((labels, (*name).to_string()))
        }
    }
}
