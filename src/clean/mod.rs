//! Dataset cleaning: missing-row removal, sentinel filters and
//! low-information column pruning.
//!
//! Cleaning runs once per disease before partitioning, in a fixed order:
//! rows with any missing value are dropped, then the descriptor's sentinel
//! row filters apply, then zero-information and near-constant columns are
//! pruned. Pruning decisions are computed for every column on the same
//! row-cleaned table before any column is removed, so drops never influence
//! each other.

use arrow::array::{Array, BooleanArray, StringArray};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::{debug, info};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::Result;
use crate::registry::{DiseaseDescriptor, RowFilter};
use crate::table::{filter_record_batch, is_missing, value_to_string};

/// Clean one disease's raw table
///
/// `prune_threshold` is the near-constant cutoff: a column whose most
/// frequent value covers more than this fraction of rows is dropped.
///
/// # Errors
/// Returns an error if a filter or projection fails
pub fn clean(
    batch: &RecordBatch,
    disease: &DiseaseDescriptor,
    prune_threshold: f64,
) -> Result<RecordBatch> {
    let rows_before = batch.num_rows();

    let batch = drop_missing_rows(batch)?;
    let batch = apply_row_filters(&batch, disease)?;
    let batch = prune_columns(&batch, prune_threshold)?;

    info!(
        "Cleaned {}: {} -> {} rows, {} columns kept",
        disease.key,
        rows_before,
        batch.num_rows(),
        batch.num_columns()
    );
    Ok(batch)
}

/// Drop every row containing a missing value in any column
///
/// # Errors
/// Returns an error if the row filter fails
pub fn drop_missing_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    let mask: BooleanArray = (0..batch.num_rows())
        .map(|row| {
            Some(
                !batch
                    .columns()
                    .iter()
                    .any(|col| is_missing(col.as_ref(), row)),
            )
        })
        .collect();

    let kept = filter_record_batch(batch, &mask)?;
    let dropped = batch.num_rows() - kept.num_rows();
    if dropped > 0 {
        debug!("Dropped {dropped} rows with missing values");
    }
    Ok(kept)
}

/// Apply the descriptor's sentinel row filters
///
/// A filter naming a column the table does not have is skipped, matching
/// the tolerant behavior expected from partially pruned sources.
///
/// # Errors
/// Returns an error if the row filter fails
pub fn apply_row_filters(
    batch: &RecordBatch,
    disease: &DiseaseDescriptor,
) -> Result<RecordBatch> {
    let mut current = batch.clone();

    for rule in disease.row_filters {
        let RowFilter::ExcludeValue { column, value } = rule;
        let Some((idx, _)) = current.schema().column_with_name(column) else {
            debug!("Row filter column '{column}' absent, skipping");
            continue;
        };
        let col = current.column(idx).clone();
        let Some(strings) = col.as_any().downcast_ref::<StringArray>() else {
            debug!("Row filter column '{column}' is not a string column, skipping");
            continue;
        };

        let sentinel = value.to_lowercase();
        let mask: BooleanArray = (0..strings.len())
            .map(|row| {
                Some(strings.is_null(row) || strings.value(row).to_lowercase() != sentinel)
            })
            .collect();

        let kept = filter_record_batch(&current, &mask)?;
        let dropped = current.num_rows() - kept.num_rows();
        if dropped > 0 {
            info!("Dropped {dropped} '{value}' rows from column '{column}'");
        }
        current = kept;
    }

    Ok(current)
}

/// Drop zero-information and near-constant columns
///
/// A column is dropped when it has at most one distinct value, or when its
/// single most frequent value accounts for more than `threshold` of rows.
///
/// # Errors
/// Returns an error if a column value cannot be rendered or the projection
/// fails
pub fn prune_columns(batch: &RecordBatch, threshold: f64) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    if rows == 0 {
        return Ok(batch.clone());
    }

    let mut to_drop: SmallVec<[usize; 16]> = SmallVec::new();

    for (idx, field) in batch.schema().fields().iter().enumerate() {
        let column = batch.column(idx);
        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        for row in 0..rows {
            let rendered = if column.is_null(row) {
                String::new()
            } else {
                value_to_string(column.as_ref(), row)?
            };
            *counts.entry(rendered).or_insert(0) += 1;
        }

        let distinct = counts.len();
        let top = counts.values().copied().max().unwrap_or(0);
        let top_fraction = top as f64 / rows as f64;

        if distinct <= 1 {
            debug!("Dropping zero-information column '{}'", field.name());
            to_drop.push(idx);
        } else if top_fraction > threshold {
            debug!(
                "Dropping near-constant column '{}' (top value covers {:.1}% of rows)",
                field.name(),
                top_fraction * 100.0
            );
            to_drop.push(idx);
        }
    }

    if to_drop.is_empty() {
        return Ok(batch.clone());
    }

    let dropped_names = to_drop
        .iter()
        .map(|&i| batch.schema().field(i).name().clone())
        .join(", ");
    info!("Pruned {} low-information columns: {dropped_names}", to_drop.len());

    let kept: Vec<usize> = (0..batch.num_columns())
        .filter(|i| !to_drop.contains(i))
        .collect();
    Ok(batch.project(&kept)?)
}
