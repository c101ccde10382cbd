//! Partition, spawn, join and aggregate.

use crate::error::ReduceError;
use crate::models::{Matrix, PartialResult, Partition, Reduction};
use crate::partition;
use crate::reduce::worker::WorkerTask;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

/// Runs parallel sums with a fixed worker count.
#[derive(Debug, Clone, Copy)]
pub struct Coordinator {
    workers: usize,
}

impl Coordinator {
    /// Create a coordinator. Fails fast when `workers` is zero.
    pub fn new(workers: usize) -> Result<Self, ReduceError> {
        if workers == 0 {
            return Err(ReduceError::InvalidWorkerCount { requested: workers });
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Sum every element of `matrix`.
    pub async fn sum(&self, matrix: Arc<Matrix>) -> Result<f64, ReduceError> {
        Ok(self.sum_detailed(matrix).await?.total)
    }

    /// Sum every element of `matrix`, keeping the per-partition breakdown.
    pub async fn sum_detailed(&self, matrix: Arc<Matrix>) -> Result<Reduction, ReduceError> {
        let start = Instant::now();
        let plan = partition::plan(matrix.rows(), self.workers)?;
        debug!(
            "Planned {} partition(s) of up to {} rows over {} rows, {} idle worker(s)",
            plan.len(),
            plan.chunk_size(),
            plan.total_rows(),
            plan.idle_workers()
        );
        if plan.is_empty() {
            debug!("Matrix has no rows, nothing to spawn");
        }

        let handles: Vec<(Partition, JoinHandle<PartialResult>)> = plan
            .partitions()
            .iter()
            .copied()
            .enumerate()
            .map(|(id, partition)| {
                let task = WorkerTask::new(id, matrix.clone(), partition);
                (partition, tokio::task::spawn_blocking(move || task.run()))
            })
            .collect();

        debug!("Spawned {} worker tasks", handles.len());

        let partials = join_workers(handles).await?;
        let total = partials.iter().map(|p| p.value).sum();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            "Summed {}x{} matrix with {} of {} workers: {}",
            matrix.rows(),
            matrix.cols(),
            partials.len(),
            self.workers,
            total
        );

        Ok(Reduction {
            requested_workers: self.workers,
            partials,
            total,
            elapsed_ms,
        })
    }
}

/// Sum `matrix` using `worker_count` workers.
pub async fn sum(matrix: Arc<Matrix>, worker_count: usize) -> Result<f64, ReduceError> {
    Coordinator::new(worker_count)?.sum(matrix).await
}

/// Join barrier: wait for every worker, failing the whole call if any
/// worker cannot be joined.
async fn join_workers(
    handles: Vec<(Partition, JoinHandle<PartialResult>)>,
) -> Result<Vec<PartialResult>, ReduceError> {
    let (partitions, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();

    join_all(handles)
        .await
        .into_iter()
        .zip(partitions)
        .map(|(joined, partition)| {
            joined.map_err(|e| ReduceError::WorkerJoin {
                partition,
                reason: join_failure(&e),
            })
        })
        .collect()
}

fn join_failure(error: &JoinError) -> String {
    if error.is_cancelled() {
        "task was cancelled".to_string()
    } else if error.is_panic() {
        "task panicked".to_string()
    } else {
        error.to_string()
    }
}
