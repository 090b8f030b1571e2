use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MatrixError {
    #[error("entry ({row}, {col}) outside {rows}x{cols} matrix")]
    OutOfBounds { row: usize, col: usize, rows: usize, cols: usize },
}

/// Coordinate-format sparse matrix as produced by the external solver.
///
/// Entries keep insertion order. Explicitly stored zeros are kept in storage
/// but skipped by [`SparseMatrix::nonzeros`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix", into = "RawMatrix")]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<(usize, usize, f64)>,
}

#[derive(Serialize, Deserialize)]
struct RawMatrix {
    shape: (usize, usize),
    #[serde(default)]
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, entries: Vec::new() }
    }

    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self, MatrixError> {
        let mut matrix = Self::new(rows, cols);
        for (row, col, value) in triplets {
            matrix.push(row, col, value)?;
        }
        Ok(matrix)
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::OutOfBounds { row, col, rows: self.rows, cols: self.cols });
        }
        self.entries.push((row, col, value));
        Ok(())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Stored entries that are not exactly zero, in storage order.
    pub fn nonzeros(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.entries.iter().copied().filter(|&(_, _, v)| v != 0.0)
    }

    pub fn nnz(&self) -> usize {
        self.nonzeros().count()
    }

    /// Sum of every stored entry, per row.
    pub fn row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.rows];
        for &(row, _, value) in &self.entries {
            sums[row] += value;
        }
        sums
    }
}

impl TryFrom<RawMatrix> for SparseMatrix {
    type Error = MatrixError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        Self::from_triplets(raw.shape.0, raw.shape.1, raw.entries)
    }
}

impl From<SparseMatrix> for RawMatrix {
    fn from(matrix: SparseMatrix) -> Self {
        Self {
            shape: (matrix.rows, matrix.cols),
            entries: matrix.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_bounds_entries() {
        let err = SparseMatrix::from_triplets(2, 2, [(0, 0, 1.0), (2, 1, 3.0)]).unwrap_err();
        assert_eq!(err, MatrixError::OutOfBounds { row: 2, col: 1, rows: 2, cols: 2 });
    }

    #[test]
    fn row_sums_include_cancelling_entries() {
        let m = SparseMatrix::from_triplets(3, 2, [(0, 0, 5.0), (0, 1, -5.0), (1, 0, 5.0), (1, 1, -3.0)])
            .unwrap();
        assert_eq!(m.row_sums(), vec![0.0, 2.0, 0.0]);
    }

    #[test]
    fn nonzeros_skip_stored_zeros() {
        let m = SparseMatrix::from_triplets(2, 2, [(0, 0, 0.0), (1, 1, 4.0)]).unwrap();
        assert_eq!(m.nonzeros().collect::<Vec<_>>(), vec![(1, 1, 4.0)]);
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn deserializes_shape_and_entries() {
        let m: SparseMatrix =
            serde_json::from_str(r#"{"shape": [2, 3], "entries": [[1, 2, 0.5]]}"#).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.nonzeros().next(), Some((1, 2, 0.5)));

        let bad = serde_json::from_str::<SparseMatrix>(r#"{"shape": [1, 1], "entries": [[1, 0, 1.0]]}"#);
        assert!(bad.is_err());
    }
}
