use crate::error::{MlError, MlResult};

use serde::{Deserialize, Serialize};

/// Dense 2-D matrix of `f64`, the design-matrix type every model consumes.
///
/// Stores data in a flat contiguous `Vec<f64>` with row-major layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl Matrix {
    /// Create a matrix from row-major data.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> MlResult<Self> {
        if data.len() != rows * cols {
            return Err(MlError::DimensionMismatch(format!(
                "{} values cannot fill a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Matrix { data, rows, cols })
    }

    /// Create a matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> MlResult<Self> {
        if rows.is_empty() {
            return Ok(Matrix::zeros(0, 0));
        }
        let cols = rows[0].len();
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(MlError::ShapeMismatch {
                expected: (1, cols),
                got: (1, bad.len()),
            });
        }
        let data: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Matrix::new(data, rows.len(), cols)
    }

    /// Build a matrix whose j-th column is `columns[j]`.
    pub fn from_columns(columns: &[Vec<f64>]) -> MlResult<Self> {
        if columns.is_empty() {
            return Ok(Matrix::zeros(0, 0));
        }
        let rows = columns[0].len();
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(MlError::ShapeMismatch {
                expected: (rows, 1),
                got: (bad.len(), 1),
            });
        }
        let cols = columns.len();
        let mut data = vec![0.0; rows * cols];
        for (j, column) in columns.iter().enumerate() {
            for (i, &v) in column.iter().enumerate() {
                data[i * cols + j] = v;
            }
        }
        Matrix::new(data, rows, cols)
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Checked element access.
    pub fn get(&self, i: usize, j: usize) -> MlResult<f64> {
        if i >= self.rows {
            return Err(MlError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: self.rows,
            });
        }
        if j >= self.cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: self.cols,
            });
        }
        Ok(self.data[i * self.cols + j])
    }

    /// Set a single element.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> MlResult<()> {
        if i >= self.rows || j >= self.cols {
            return Err(MlError::IndexOutOfBounds {
                index: if i >= self.rows { i } else { j },
                axis: if i >= self.rows { 0 } else { 1 },
                size: if i >= self.rows { self.rows } else { self.cols },
            });
        }
        self.data[i * self.cols + j] = value;
        Ok(())
    }

    /// Borrow row `i` as a slice. Panics when `i` is out of range, like slice indexing.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Copy column `j` out.
    pub fn column(&self, j: usize) -> MlResult<Vec<f64>> {
        if j >= self.cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: self.cols,
            });
        }
        Ok((0..self.rows).map(|i| self.data[i * self.cols + j]).collect())
    }

    // ─── Shape Manipulation ─────────────────────────────────────────────────

    /// Gather rows by index (indices may repeat, e.g. bootstrap samples).
    pub fn select_rows(&self, indices: &[usize]) -> MlResult<Matrix> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            if i >= self.rows {
                return Err(MlError::IndexOutOfBounds {
                    index: i,
                    axis: 0,
                    size: self.rows,
                });
            }
            data.extend_from_slice(self.row(i));
        }
        Matrix::new(data, indices.len(), self.cols)
    }

    /// Concatenate matrices column-wise. All inputs must share a row count.
    pub fn hstack(blocks: &[&Matrix]) -> MlResult<Matrix> {
        let Some(first) = blocks.first() else {
            return Err(MlError::EmptyInput("hstack of zero blocks".into()));
        };
        let rows = first.rows;
        if let Some(bad) = blocks.iter().find(|b| b.rows != rows) {
            return Err(MlError::ShapeMismatch {
                expected: (rows, bad.cols),
                got: bad.shape(),
            });
        }
        let cols: usize = blocks.iter().map(|b| b.cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for b in blocks {
                data.extend_from_slice(b.row(i));
            }
        }
        Matrix::new(data, rows, cols)
    }

    // ─── Linear Algebra ─────────────────────────────────────────────────────

    /// Matrix-vector product `self · v`.
    pub fn dot_vec(&self, v: &[f64]) -> MlResult<Vec<f64>> {
        if v.len() != self.cols {
            return Err(MlError::DimensionMismatch(format!(
                "cannot multiply {}x{} matrix by vector of length {}",
                self.rows,
                self.cols,
                v.len()
            )));
        }
        Ok((0..self.rows)
            .map(|i| self.row(i).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    /// Mean of each column.
    pub fn column_means(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.cols];
        for i in 0..self.rows {
            for (s, &v) in sums.iter_mut().zip(self.row(i)) {
                *s += v;
            }
        }
        let n = self.rows.max(1) as f64;
        sums.into_iter().map(|s| s / n).collect()
    }

    /// Population standard deviation of each column.
    pub fn column_stds(&self) -> Vec<f64> {
        let means = self.column_means();
        let mut acc = vec![0.0; self.cols];
        for i in 0..self.rows {
            for ((a, &v), &m) in acc.iter_mut().zip(self.row(i)).zip(&means) {
                *a += (v - m) * (v - m);
            }
        }
        let n = self.rows.max(1) as f64;
        acc.into_iter().map(|a| (a / n).sqrt()).collect()
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
