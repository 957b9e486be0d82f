use crate::error::{MatrixError, Result};

/// Dense row-major matrix buffer.
///
/// Used for bulk conversion and as the transient host-side buffer of an
/// accelerated dot product.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseArray<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> DenseArray<T> {
    /// Creates a `rows x cols` array with every element set to `fill`.
    pub fn filled(rows: usize, cols: usize, fill: T) -> Self {
        DenseArray {
            rows,
            cols,
            data: vec![fill; rows * cols],
        }
    }

    /// Creates an array from row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatrixError::DimensionMismatch(format!(
                "Data length ({}) does not match dimensions ({}x{})",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(DenseArray { rows, cols, data })
    }

    /// Creates an array from a slice of rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, |row| row.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(MatrixError::InvalidShape(format!(
                    "Row {} has {} elements, expected {}",
                    r,
                    row.len(),
                    cols
                )));
            }
            data.extend(row.iter().cloned());
        }
        Ok(DenseArray {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the element at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    /// Overwrites the element at `(row, col)`. Out-of-bounds writes are ignored and
    /// reported through the return value.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.data[row * self.cols + col] = value;
        true
    }

    /// Row-major contents.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Copies the contents out as a vector of rows.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(|row| row.to_vec()).collect()
    }
}
