//! Dense matrices built from relation tables.
//!
//! ```text
//! RelationTable ──┐
//! rows: IndexedVector ──► MatrixProjector::project ──► Matrix ──► metrics
//! cols: IndexedVector ──┘
//! ```

pub mod projector;

use serde::{Deserialize, Serialize};

pub use projector::MatrixProjector;

use crate::{Error, Result};

/// Dense row-major `rows × cols` matrix of `f32`. Row = source, column =
/// target; absent edges are 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

/// Wire form of [`Matrix`], checked before it becomes one.
#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = Error;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        match raw.rows.checked_mul(raw.cols) {
            Some(len) if len == raw.data.len() => {
                Ok(Self { rows: raw.rows, cols: raw.cols, data: raw.data })
            }
            _ => Err(Error::InvalidArgument(format!(
                "matrix {}x{} cannot hold {} values",
                raw.rows,
                raw.cols,
                raw.data.len()
            ))),
        }
    }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Build from row vectors. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n = rows.len();
        Some(Self { rows: n, cols, data: rows.into_iter().flatten().collect() })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.rows).map(|r| self.row(r).iter().sum()).collect()
    }

    pub fn col_sums(&self) -> Vec<f32> {
        let mut sums = vec![0.0; self.cols];
        for r in 0..self.rows {
            for (c, v) in self.row(r).iter().enumerate() {
                sums[c] += v;
            }
        }
        sums
    }

    /// Elementwise map into a new matrix.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self { rows: self.rows, cols: self.cols, data: self.data.iter().map(|v| f(*v)).collect() }
    }

    /// Copy into a larger zero matrix, placing cell `(r, c)` at
    /// `(row_map[r], col_map[c])`.
    pub fn embed(&self, rows: usize, cols: usize, row_map: &[usize], col_map: &[usize]) -> Self {
        let mut out = Self::zeros(rows, cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(row_map[r], col_map[c], self.get(r, c));
            }
        }
        out
    }
}
