//! Matrix input: files on disk or generated shapes.

pub mod loader;

pub use loader::{generate_matrix, load_matrix};
