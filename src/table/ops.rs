//! Row-level operations on record batches.

use arrow::array::{Array, ArrayRef, BooleanArray, StringArray, UInt32Array};
use arrow::compute::{filter, take};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;

use crate::error::{PipelineError, Result};

/// String values treated as missing in addition to Arrow nulls.
///
/// Mirrors the NA handling of the upstream CSV sources, where empty fields
/// and the literal `N/A` both denote an absent measurement.
const MISSING_SENTINELS: &[&str] = &["", "n/a"];

/// Filter a record batch based on a boolean mask
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `mask` - The boolean mask indicating which rows to keep
///
/// # Returns
/// A new record batch with only rows where mask is true
///
/// # Errors
/// Returns an error if the mask length does not match the batch
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(PipelineError::data(format!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }

    let filtered_columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| filter(col.as_ref(), mask))
        .collect::<arrow::error::Result<_>>()?;

    Ok(RecordBatch::try_new(batch.schema(), filtered_columns)?)
}

/// Select rows of a record batch by index, in the given order
///
/// # Errors
/// Returns an error if any index is out of bounds
pub fn take_record_batch(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch> {
    let index_array = UInt32Array::from(indices.iter().map(|&i| i as u32).collect::<Vec<_>>());

    let taken_columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| take(col.as_ref(), &index_array, None))
        .collect::<arrow::error::Result<_>>()?;

    Ok(RecordBatch::try_new(batch.schema(), taken_columns)?)
}

/// Whether the value at `row` of `column` counts as missing
///
/// Arrow nulls are always missing; string columns additionally treat the
/// values in [`MISSING_SENTINELS`] (case-insensitively) as missing.
#[must_use]
pub fn is_missing(column: &dyn Array, row: usize) -> bool {
    if column.is_null(row) {
        return true;
    }
    if column.data_type() == &DataType::Utf8 {
        if let Some(strings) = column.as_any().downcast_ref::<StringArray>() {
            let value = strings.value(row).trim().to_lowercase();
            return MISSING_SENTINELS.contains(&value.as_str());
        }
    }
    false
}

/// Render the value at `row` of `column` as a string
///
/// Used for distinct-value and frequency counting where the scalar type of
/// the column does not matter.
///
/// # Errors
/// Returns an error if the value cannot be rendered
pub fn value_to_string(column: &dyn Array, row: usize) -> Result<String> {
    Ok(array_value_to_string(column, row)?)
}
