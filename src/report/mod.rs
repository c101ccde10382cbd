//! Report rendering.

pub mod generator;

pub use generator::{render_counter, render_reduction, write_report};
