//! Deterministic partitioning of a cleaned dataset across custodians.
//!
//! Rows are shuffled with a seeded Fisher-Yates permutation
//! (`StdRng::seed_from_u64`, the `rand` crate's `SliceRandom::shuffle`) and
//! split into contiguous near-equal blocks. The seed is part of the
//! reproducibility contract: the same cleaned table and seed always produce
//! byte-identical partitions.

use arrow::record_batch::RecordBatch;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::registry::{Custodian, DiseaseDescriptor};
use crate::table::{take_record_batch, write_csv};

/// Block sizes for splitting `rows` into `parts` contiguous blocks
///
/// The first `rows mod parts` blocks receive one extra row, the rest
/// receive `rows div parts` rows (array_split semantics).
#[must_use]
pub fn split_sizes(rows: usize, parts: usize) -> Vec<usize> {
    let base = rows / parts;
    let extra = rows % parts;
    (0..parts)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Shuffled row indices for a table of `rows` rows under the given seed
#[must_use]
pub fn shuffled_indices(rows: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// Split a cleaned table into `parts` shuffled, contiguous partitions
///
/// # Errors
/// Returns an error if row selection fails
pub fn partition_batch(batch: &RecordBatch, seed: u64, parts: usize) -> Result<Vec<RecordBatch>> {
    let indices = shuffled_indices(batch.num_rows(), seed);
    let sizes = split_sizes(batch.num_rows(), parts);

    let mut partitions = Vec::with_capacity(parts);
    let mut offset = 0;
    for size in sizes {
        let block = &indices[offset..offset + size];
        partitions.push(take_record_batch(batch, block)?);
        offset += size;
    }
    Ok(partitions)
}

/// Split a cleaned table and persist one CSV per custodian
///
/// Existing partition files are overwritten. Returns the partition sizes in
/// custodian order.
///
/// # Errors
/// Returns an error if partitioning or persistence fails
pub fn partition_and_save(
    batch: &RecordBatch,
    disease: &DiseaseDescriptor,
    custodians: &[Custodian],
    config: &PipelineConfig,
) -> Result<Vec<usize>> {
    let partitions = partition_batch(batch, config.seed, custodians.len())?;

    let mut sizes = Vec::with_capacity(partitions.len());
    for (partition, custodian) in partitions.iter().zip(custodians) {
        let path = config.partition_path(custodian, disease);
        write_csv(partition, &path)?;
        sizes.push(partition.num_rows());
    }

    info!(
        "Partitioned {} into {:?} rows across {} custodians",
        disease.key,
        sizes,
        custodians.len()
    );
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn indexed_batch(rows: usize) -> RecordBatch {
        RecordBatch::try_from_iter(vec![(
            "row_id",
            Arc::new(Int64Array::from((0..rows as i64).collect::<Vec<_>>())) as ArrayRef,
        )])
        .unwrap()
    }

    fn row_ids(batch: &RecordBatch) -> Vec<i64> {
        let ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        (0..ids.len()).map(|i| ids.value(i)).collect()
    }

    #[test]
    fn test_split_sizes_remainder_policy() {
        assert_eq!(split_sizes(100, 3), vec![34, 33, 33]);
        assert_eq!(split_sizes(9, 3), vec![3, 3, 3]);
        assert_eq!(split_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(split_sizes(11, 3), vec![4, 4, 3]);
        assert_eq!(split_sizes(2, 3), vec![1, 1, 0]);
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let a = shuffled_indices(50, 42);
        let b = shuffled_indices(50, 42);
        assert_eq!(a, b);

        let c = shuffled_indices(50, 7);
        assert_ne!(a, c);
    }

    #[test]
    fn test_partition_completeness() {
        let batch = indexed_batch(100);
        let partitions = partition_batch(&batch, 42, 3).unwrap();

        let mut seen = HashSet::new();
        let mut total = 0;
        for partition in &partitions {
            for id in row_ids(partition) {
                assert!(seen.insert(id), "row {id} appears in two partitions");
                total += 1;
            }
        }
        assert_eq!(total, 100);
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn test_partition_balance() {
        let batch = indexed_batch(100);
        let partitions = partition_batch(&batch, 42, 3).unwrap();
        let sizes: Vec<usize> = partitions.iter().map(RecordBatch::num_rows).collect();
        assert_eq!(sizes, vec![34, 33, 33]);
    }

    #[test]
    fn test_partition_determinism_across_runs() {
        let batch = indexed_batch(60);
        let first = partition_batch(&batch, 42, 3).unwrap();
        let second = partition_batch(&batch, 42, 3).unwrap();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(row_ids(a), row_ids(b));
        }
    }
}
