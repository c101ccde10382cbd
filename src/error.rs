//! Error types for the reduction engine and the counter agent.
//!
//! Application glue (`main`, config and dataset loading, reports) stays on
//! `anyhow`; the modules with a real failure taxonomy expose these instead.

use crate::models::Partition;

/// Errors raised by a parallel reduction.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    /// Configuration error: at least one worker is required.
    #[error("Invalid worker count: {requested} (must be at least 1)")]
    InvalidWorkerCount { requested: usize },

    #[error("Matrix is not rectangular: row {row} has {found} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Fatal: a worker task could not be joined. The whole call is void.
    #[error("Worker for {partition} could not be joined: {reason}")]
    WorkerJoin { partition: Partition, reason: String },
}

/// A failed publish hand-off. Always recoverable for the agent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[allow(dead_code)] // Raised by observers that refuse a value; the terminal one never does
    #[error("Observer rejected the value: {0}")]
    Rejected(String),

    #[error("Observer is no longer listening")]
    ObserverGone,
}

/// Errors surfaced when collecting the result of a background task.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Agent task could not be joined: {0}")]
    Join(String),

    #[error("Watchdog task could not be joined: {0}")]
    WatchdogJoin(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ReduceError::InvalidWorkerCount { requested: 0 };
        assert_eq!(
            err.to_string(),
            "Invalid worker count: 0 (must be at least 1)"
        );

        let err = ReduceError::RaggedMatrix {
            row: 1,
            expected: 2,
            found: 3,
        };
        assert!(err.to_string().contains("row 1 has 3 columns, expected 2"));

        let fatal = ReduceError::WorkerJoin {
            partition: Partition::new(0, 2),
            reason: "task was cancelled".to_string(),
        };
        assert!(fatal.to_string().contains("rows 0..2"));
        assert!(fatal.to_string().ends_with("task was cancelled"));
    }

    #[test]
    fn test_publish_errors_compare() {
        assert_eq!(PublishError::ObserverGone, PublishError::ObserverGone);
        assert_ne!(
            PublishError::Rejected("a".to_string()),
            PublishError::ObserverGone
        );
    }
}
