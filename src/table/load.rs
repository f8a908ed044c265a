//! CSV reading and writing for disease tables.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use log::info;

use crate::config::ensure_dir;
use crate::error::Result;

/// Batch size used when reading CSV files
const CSV_BATCH_SIZE: usize = 8192;

/// Rows examined for schema inference
const INFER_MAX_RECORDS: usize = 1000;

/// Read a CSV file into a single record batch
///
/// The first line is treated as the header; column types are inferred from
/// the leading rows. All batches are concatenated so callers see the whole
/// table at once.
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    let start = std::time::Instant::now();
    let mut file = File::open(path)?;

    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, Some(INFER_MAX_RECORDS))?;
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(CSV_BATCH_SIZE)
        .build(file)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = if batches.is_empty() {
        RecordBatch::new_empty(schema)
    } else {
        arrow::compute::concat_batches(&schema, &batches)?
    };

    info!(
        "Read {} rows x {} columns from {} in {:?}",
        batch.num_rows(),
        batch.num_columns(),
        path.display(),
        start.elapsed()
    );
    Ok(batch)
}

/// Write a record batch to a CSV file with a header row
///
/// Parent directories are created as needed; an existing file at the path
/// is overwritten.
///
/// # Errors
/// Returns an error if the directory or file cannot be created or written
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;

    info!("Saved {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}
