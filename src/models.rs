//! Data models shared by the reduction engine, the counter agent and the
//! report generator.

use crate::error::ReduceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An immutable, rectangular grid of values stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// Build a matrix from nested rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ReduceError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * cols);

        for (index, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ReduceError::RaggedMatrix {
                    row: index,
                    expected: cols,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            values,
        })
    }

    /// An empty matrix with no rows.
    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            values: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow a single row. Panics if `index >= rows()`.
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.cols;
        &self.values[start..start + self.cols]
    }

    /// Single-threaded reference sum over every element.
    #[allow(dead_code)] // Reference result for checking the parallel sum
    pub fn sequential_sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// A contiguous range of rows assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// First row (inclusive).
    pub start: usize,
    /// Number of rows.
    pub length: usize,
}

impl Partition {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// One past the last row.
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows {}..{}", self.start, self.end())
    }
}

/// The value one worker computed over its partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub worker: usize,
    pub partition: Partition,
    pub value: f64,
}

/// The full outcome of one reduction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reduction {
    /// Worker count the caller asked for.
    pub requested_workers: usize,
    /// One entry per worker task actually spawned, in row order.
    pub partials: Vec<PartialResult>,
    /// Sum of all partial results.
    pub total: f64,
    /// Wall-clock time spent between planning and the join barrier.
    pub elapsed_ms: f64,
}

impl Reduction {
    /// Number of worker tasks that were spawned.
    pub fn spawned_workers(&self) -> usize {
        self.partials.len()
    }

    /// Requested workers that received no partition.
    pub fn idle_workers(&self) -> usize {
        self.requested_workers.saturating_sub(self.partials.len())
    }
}

/// Which way the counter moves on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Increment,
    Decrement,
}

impl Direction {
    /// The amount applied to the counter for one tick.
    pub fn step(&self) -> i64 {
        match self {
            Direction::Increment => 1,
            Direction::Decrement => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Increment => write!(f, "up"),
            Direction::Decrement => write!(f, "down"),
        }
    }
}

/// A point-in-time view of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub counter: i64,
    pub direction: Direction,
    pub running: bool,
}

/// A command accepted by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Increment,
    Decrement,
    Stop,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "increment" | "+" => Ok(Command::Increment),
            "down" | "decrement" | "-" => Ok(Command::Decrement),
            "stop" | "quit" | "q" => Ok(Command::Stop),
            other => Err(format!("Unknown command: {other}")),
        }
    }
}

/// Who halted the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopSource {
    Manual,
    Watchdog,
}

impl fmt::Display for StopSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopSource::Manual => write!(f, "manual stop"),
            StopSource::Watchdog => write!(f, "watchdog"),
        }
    }
}

/// Returned by the agent task once its loop has halted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    /// Loop iterations executed.
    pub ticks: u64,
    /// Values the observer acknowledged.
    pub published: u64,
    /// Values lost to a failed hand-off.
    pub failed_publishes: u64,
    pub final_counter: i64,
    pub final_direction: Direction,
    pub stopped_by: Option<StopSource>,
}

/// Returned by the watchdog task after it has fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogOutcome {
    /// The sleep ended early because of an interruption.
    pub interrupted: bool,
    /// This watchdog's stop was the one that halted the agent.
    pub stopped_agent: bool,
    pub elapsed_ms: u64,
}

/// Metadata attached to every rendered report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
}

impl RunMetadata {
    pub fn now() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// Report for a `sum` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReductionReport {
    pub metadata: RunMetadata,
    /// Where the matrix came from (a path or a generated shape).
    pub source: String,
    pub rows: usize,
    pub cols: usize,
    pub reduction: Reduction,
}

/// Report for a `count` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterReport {
    pub metadata: RunMetadata,
    pub tick_ms: u64,
    pub deadline_secs: u64,
    pub agent: AgentReport,
    /// Absent when the agent was stopped before the watchdog fired.
    pub watchdog: Option<WatchdogOutcome>,
}
