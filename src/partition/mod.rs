//! Row partitioning for the parallel reduction.
//!
//! The chunk size is `rows % workers + rows / workers`. This is not a
//! balanced split: for inputs that do not divide evenly it produces fewer
//! partitions than requested and leaves the remaining workers idle.

use crate::error::ReduceError;
use crate::models::Partition;

/// Ordered, disjoint partitions covering `[0, total_rows)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    total_rows: usize,
    requested_workers: usize,
    chunk_size: usize,
    partitions: Vec<Partition>,
}

impl PartitionPlan {
    /// Number of rows covered by the plan.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Rows per partition (the last one may be shorter).
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Requested workers that receive no partition.
    pub fn idle_workers(&self) -> usize {
        self.requested_workers - self.partitions.len()
    }
}

/// Compute the chunk size for `total_rows` split across `workers`.
pub fn chunk_size(total_rows: usize, workers: usize) -> Result<usize, ReduceError> {
    if workers == 0 {
        return Err(ReduceError::InvalidWorkerCount { requested: workers });
    }
    Ok(total_rows % workers + total_rows / workers)
}

/// Split `total_rows` rows across at most `workers` contiguous partitions.
pub fn plan(total_rows: usize, workers: usize) -> Result<PartitionPlan, ReduceError> {
    let size = chunk_size(total_rows, workers)?;

    // size is at least 1 whenever total_rows > 0, so the loop terminates.
    let mut partitions = Vec::new();
    let mut start = 0;
    while start < total_rows {
        let length = size.min(total_rows - start);
        partitions.push(Partition::new(start, length));
        start += length;
    }

    Ok(PartitionPlan {
        total_rows,
        requested_workers: workers,
        chunk_size: size,
        partitions,
    })
}
