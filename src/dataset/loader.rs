//! Loading and generating matrices.
//!
//! Two file formats are understood:
//! - `.json`: an array of rows, each an array of numbers.
//! - anything else: plain text, one row per line, values separated by
//!   commas and/or whitespace. Blank lines and `#` comments are skipped.

use crate::models::Matrix;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load a matrix from `path`, picking the format from the extension.
pub fn load_matrix(path: &Path) -> Result<Matrix> {
    info!("Loading matrix from: {}", path.display());

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read matrix file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let matrix = if is_json {
        parse_json(&content)
    } else {
        parse_text(&content)
    }
    .with_context(|| format!("Invalid matrix in {}", path.display()))?;

    debug!("Loaded {}x{} matrix", matrix.rows(), matrix.cols());
    Ok(matrix)
}

/// Parse a JSON array of arrays.
pub fn parse_json(content: &str) -> Result<Matrix> {
    let rows: Vec<Vec<f64>> =
        serde_json::from_str(content).context("Expected a JSON array of number arrays")?;
    Ok(Matrix::from_rows(rows)?)
}

/// Parse delimited text, one row per line.
pub fn parse_text(content: &str) -> Result<Matrix> {
    let mut rows = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| parse_value(token, index + 1))
            .collect::<Result<Vec<f64>>>()?;

        rows.push(row);
    }

    Ok(Matrix::from_rows(rows)?)
}

fn parse_value(token: &str, line: usize) -> Result<f64> {
    let value: f64 = token
        .parse()
        .with_context(|| format!("Line {}: '{}' is not a number", line, token))?;

    if !value.is_finite() {
        bail!("Line {}: '{}' is not a finite number", line, token);
    }
    Ok(value)
}

/// A `rows` x `cols` matrix holding `1, 2, 3, ...` in row-major order.
pub fn generate_matrix(rows: usize, cols: usize) -> Matrix {
    let data = (0..rows)
        .map(|r| (0..cols).map(|c| (r * cols + c + 1) as f64).collect())
        .collect();

    // Every generated row has exactly `cols` entries.
    Matrix::from_rows(data).unwrap_or_else(|_| Matrix::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_generate_matrix_is_sequential() {
        let matrix = generate_matrix(3, 2);
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.row(0), &[1.0, 2.0]);
        assert_eq!(matrix.row(2), &[5.0, 6.0]);
        assert_eq!(matrix.sequential_sum(), 21.0);

        assert!(generate_matrix(0, 4).is_empty());
    }

    #[test]
    fn test_parse_text_mixed_separators() {
        let matrix = parse_text("# header\n1, 2\n\n3 4\n5,\t6\n").unwrap();
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.cols(), 2);
        assert_eq!(matrix.row(1), &[3.0, 4.0]);
        assert_eq!(matrix.sequential_sum(), 21.0);
    }

    #[test]
    fn test_parse_text_rejects_bad_input() {
        let err = parse_text("1 2\n3 x\n").unwrap_err();
        assert!(err.to_string().contains("Line 2"));

        assert!(parse_text("1 2\n3\n").is_err());
        assert!(parse_text("1 inf\n").is_err());
    }

    #[test]
    fn test_parse_text_empty_is_empty_matrix() {
        let matrix = parse_text("# nothing here\n\n").unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_load_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[[1.5, 2.5], [3, 4]]").unwrap();

        let matrix = load_matrix(file.path()).unwrap();
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.sequential_sum(), 11.0);
    }

    #[test]
    fn test_load_text_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1 2 3").unwrap();
        writeln!(file, "4 5 6").unwrap();

        let matrix = load_matrix(file.path()).unwrap();
        assert_eq!(matrix.cols(), 3);
        assert_eq!(matrix.sequential_sum(), 21.0);
    }

    #[test]
    fn test_load_ragged_json_fails() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[[1, 2], [3]]").unwrap();

        let err = load_matrix(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("not rectangular"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_matrix(Path::new("/nonexistent/matrix.txt")).unwrap_err();
        assert!(err.to_string().contains("Failed to read matrix file"));
    }
}
