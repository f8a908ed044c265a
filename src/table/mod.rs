//! Tabular data handling on Arrow record batches.
//!
//! A disease dataset is held as a single [`arrow::record_batch::RecordBatch`]:
//! uniquely named columns of equal length. This module provides the CSV
//! loader/writer and the row-level batch operations the cleaner and
//! partitioner are built from.

pub mod load;
pub mod ops;

pub use load::{read_csv, write_csv};
pub use ops::{filter_record_batch, is_missing, take_record_batch, value_to_string};
