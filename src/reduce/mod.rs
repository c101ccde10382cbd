//! Parallel reduction over a read-only matrix.
//!
//! The coordinator plans row partitions, runs one worker task per partition
//! on the blocking pool and waits for all of them before adding up the
//! partial results.

pub mod coordinator;
pub mod worker;

pub use coordinator::{sum, Coordinator};
