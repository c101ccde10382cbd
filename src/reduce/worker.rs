//! A single worker task of the reduction.

use crate::models::{Matrix, PartialResult, Partition};
use std::sync::Arc;
use tracing::debug;

/// One unit of work: a shared read-only matrix plus the rows to sum.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    id: usize,
    matrix: Arc<Matrix>,
    partition: Partition,
}

impl WorkerTask {
    pub fn new(id: usize, matrix: Arc<Matrix>, partition: Partition) -> Self {
        Self {
            id,
            matrix,
            partition,
        }
    }

    /// Sum every element in the assigned rows.
    ///
    /// Rows past the end of the matrix are never read, even if the
    /// partition overhangs it.
    pub fn run(self) -> PartialResult {
        let end = self.partition.end().min(self.matrix.rows());
        debug!(
            "Worker {} summing rows {} to {}",
            self.id,
            self.partition.start,
            end.saturating_sub(1)
        );

        let value = (self.partition.start..end)
            .map(|row| self.matrix.row(row).iter().sum::<f64>())
            .sum();

        PartialResult {
            worker: self.id,
            partition: self.partition,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_matrix() -> Arc<Matrix> {
        Arc::new(
            Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap(),
        )
    }

    #[test]
    fn test_worker_sums_its_rows() {
        let matrix = scenario_matrix();

        let first = WorkerTask::new(0, matrix.clone(), Partition::new(0, 2)).run();
        assert_eq!(first.value, 10.0);
        assert_eq!(first.worker, 0);

        let second = WorkerTask::new(1, matrix, Partition::new(2, 1)).run();
        assert_eq!(second.value, 11.0);
        assert_eq!(second.partition, Partition::new(2, 1));
    }

    #[test]
    fn test_worker_clips_overhanging_partition() {
        let result = WorkerTask::new(0, scenario_matrix(), Partition::new(2, 5)).run();
        assert_eq!(result.value, 11.0);
    }

    #[test]
    fn test_worker_past_the_end_is_zero() {
        let result = WorkerTask::new(0, scenario_matrix(), Partition::new(7, 2)).run();
        assert_eq!(result.value, 0.0);
    }
}
