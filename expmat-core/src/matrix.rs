use rayon::prelude::*;
use std::sync::Arc;

use crate::config::MatrixConfig;
use crate::dense::DenseArray;
use crate::error::{MatrixError, Result};
use crate::key::MatrixKey;
use crate::parallel::{split_range, CancellationToken, ParallelRange};
use crate::store::SparseMatrixStore;
use crate::traits::{DotProductAccelerator, Element};

/// Sparse, lazily growing matrix.
///
/// Every cell is addressable: reading a cell that was never written yields
/// `T::zero()`, and writing any `(row, col)` grows the reported size as needed.
/// Arithmetic operations never modify their operands and always return a new
/// matrix; only the row/column insertion and deletion helpers mutate in place.
#[derive(Debug)]
pub struct Matrix<T> {
    pub(crate) store: SparseMatrixStore<T>,
    pub(crate) config: MatrixConfig,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) accelerator: Option<Arc<dyn DotProductAccelerator>>,
}

impl<T: Element> Default for Matrix<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Matrix<T> {
    /// Creates an empty (0x0) matrix with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MatrixConfig::default())
    }

    pub fn with_config(config: MatrixConfig) -> Self {
        Matrix {
            store: SparseMatrixStore::new(),
            config,
            cancellation: None,
            accelerator: None,
        }
    }

    /// Creates a `rows x cols` matrix with no stored cells.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let matrix = Self::new();
        matrix.store.ensure_bounds(rows, cols);
        matrix
    }

    /// Creates the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix.store.set(i, i, T::one());
        }
        matrix
    }

    /// Builds a matrix from a slice of equally long rows. Zero values are not stored.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        Ok(Self::from_array(&DenseArray::from_rows(rows)?))
    }

    /// Imports a dense array. Zero values are not stored, the size is kept.
    pub fn from_array(array: &DenseArray<T>) -> Self {
        let matrix = Self::zeros(array.rows(), array.cols());
        for r in 0..array.rows() {
            for c in 0..array.cols() {
                if let Some(value) = array.get(r, c) {
                    if !value.is_zero_value() {
                        matrix.store.set(r, c, value.clone());
                    }
                }
            }
        }
        matrix
    }

    /// Empty result matrix sharing this matrix's configuration and cancellation token.
    pub(crate) fn derived<U: Element>(&self, rows: usize, cols: usize) -> Matrix<U> {
        Matrix {
            store: SparseMatrixStore::with_bounds(rows, cols),
            config: self.config,
            cancellation: self.cancellation.clone(),
            accelerator: None,
        }
    }

    pub(crate) fn parallel(&self) -> ParallelRange {
        let range = ParallelRange::new(self.config.max_degree_of_parallelism);
        match &self.cancellation {
            Some(token) => range.with_cancellation(token.clone()),
            None => range,
        }
    }

    // --- Configuration ---

    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    pub fn max_degree_of_parallelism(&self) -> usize {
        self.config.max_degree_of_parallelism
    }

    pub fn set_max_degree_of_parallelism(&mut self, degree: usize) -> Result<()> {
        self.config = MatrixConfig::new(degree)?;
        Ok(())
    }

    /// Attaches a cancellation token honoured by every bulk operation on this matrix
    /// and on the matrices it produces.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    // --- Cell access ---

    /// Value at `(row, col)`; zero when the cell was never written.
    pub fn get(&self, row: usize, col: usize) -> T {
        self.store.get(row, col)
    }

    /// Defines or overwrites `(row, col)`, growing the matrix when needed.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.store.set(row, col, value);
    }

    pub fn row_count(&self) -> usize {
        self.store.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.store.column_count()
    }

    /// Returns `(rows, columns)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    /// Number of explicitly stored cells.
    pub fn nnz(&self) -> usize {
        self.store.nnz()
    }

    /// Snapshot of the stored cells, ordered by row then column.
    pub fn entries(&self) -> Vec<(MatrixKey, T)> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &SparseMatrixStore<T> {
        &self.store
    }

    /// Removes every cell; the matrix becomes 0x0.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    // --- Structural queries ---

    pub fn is_square(&self) -> bool {
        self.row_count() == self.column_count()
    }

    /// True when the matrix is square and every off-diagonal cell is zero, i.e.
    /// subtracting the diagonal-only reconstruction leaves the zero matrix.
    pub fn is_diagonal(&self) -> bool {
        self.is_square()
            && self
                .store
                .snapshot()
                .iter()
                .all(|(key, value)| key.row() == key.col() || value.is_zero_value())
    }

    /// True when every cell is zero.
    pub fn is_zero(&self) -> bool {
        self.store
            .snapshot()
            .iter()
            .all(|(_, value)| value.is_zero_value())
    }

    /// True when the matrix is square and `A · Aᵀ` equals the identity.
    ///
    /// The comparison is exact, with no tolerance. Floating-point matrices such as
    /// a rotation by an arbitrary angle usually report `false` because of rounding;
    /// use an exact element type when that matters.
    pub fn is_orthogonal(&self) -> Result<bool> {
        if !self.is_square() {
            return Ok(false);
        }
        let product = self.dot_product(&self.transpose()?)?;
        Ok(product == Matrix::identity(self.row_count()))
    }

    /// True when the matrix is square and `Aᵀ · A` equals the identity.
    ///
    /// Elements are treated as real, so no conjugation happens before the product.
    /// Like [`is_orthogonal`](Self::is_orthogonal), the identity check is exact.
    pub fn is_unitary(&self) -> Result<bool> {
        if !self.is_square() {
            return Ok(false);
        }
        let product = self.conjugate()?.transpose()?.dot_product(self)?;
        Ok(product == Matrix::identity(self.row_count()))
    }

    // --- In-place structural edits ---

    pub fn insert_empty_row(&mut self, index: usize) -> Result<()> {
        self.store.insert_empty_row(index)
    }

    pub fn insert_empty_column(&mut self, index: usize) -> Result<()> {
        self.store.insert_empty_column(index)
    }

    pub fn delete_row(&mut self, index: usize) -> Result<()> {
        self.store.delete_row(index)
    }

    pub fn delete_column(&mut self, index: usize) -> Result<()> {
        self.store.delete_column(index)
    }

    // --- Conversions ---

    /// Dense row-major copy; cells that were never written become zero.
    pub fn to_array(&self) -> DenseArray<T> {
        let (rows, cols) = self.dims();
        let mut array = DenseArray::filled(rows, cols, T::zero());
        for (key, value) in self.store.snapshot() {
            array.set(key.row(), key.col(), value);
        }
        array
    }

    /// Column-major jagged copy: `result[col][row]`.
    pub fn to_jagged_columns(&self) -> Vec<Vec<T>> {
        let (rows, cols) = self.dims();
        let mut columns = vec![vec![T::zero(); rows]; cols];
        for (key, value) in self.store.snapshot() {
            columns[key.col()][key.row()] = value;
        }
        columns
    }

    /// Maps every stored cell through `f` into a matrix of the same size.
    pub fn select<U, F>(&self, f: F) -> Matrix<U>
    where
        U: Element,
        F: Fn(&T) -> U,
    {
        let (rows, cols) = self.dims();
        let mapped: Matrix<U> = self.derived(rows, cols);
        for (key, value) in self.store.snapshot() {
            mapped.store.set(key.row(), key.col(), f(&value));
        }
        mapped
    }
}

/// Deep copy of every stored cell, spread over the entry list in parallel.
impl<T: Element> Clone for Matrix<T> {
    fn clone(&self) -> Self {
        let (rows, cols) = self.dims();
        let cloned: Matrix<T> = self.derived(rows, cols);
        let entries = self.store.snapshot();
        let chunks = ParallelRange::new(self.config.max_degree_of_parallelism)
            .chunk_count(entries.len());
        if chunks > 0 {
            (0..chunks).into_par_iter().for_each(|chunk| {
                let (start, len) = split_range(entries.len(), chunk, chunks);
                for (key, value) in &entries[start..start + len] {
                    cloned.store.set(key.row(), key.col(), value.clone());
                }
            });
        }
        Matrix {
            accelerator: self.accelerator.clone(),
            ..cloned
        }
    }
}

/// Element-wise equality over the logical size; absent cells compare as zero.
impl<T: Element> PartialEq for Matrix<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.dims() != other.dims() {
            return false;
        }
        self.store
            .snapshot()
            .iter()
            .all(|(key, value)| *value == other.get(key.row(), key.col()))
            && other
                .store
                .snapshot()
                .iter()
                .all(|(key, value)| *value == self.get(key.row(), key.col()))
    }
}

/// Fails with a dimension error unless both matrices have the same size.
pub(crate) fn ensure_same_dims<T: Element>(
    op: &str,
    a: &Matrix<T>,
    b: &Matrix<T>,
) -> Result<()> {
    if a.dims() != b.dims() {
        return Err(MatrixError::DimensionMismatch(format!(
            "{} requires equal sizes ({}x{} vs {}x{})",
            op,
            a.row_count(),
            a.column_count(),
            b.row_count(),
            b.column_count()
        )));
    }
    Ok(())
}

pub(crate) fn ensure_square<T: Element>(a: &Matrix<T>) -> Result<usize> {
    if !a.is_square() {
        return Err(MatrixError::not_square(a.row_count(), a.column_count()));
    }
    Ok(a.row_count())
}
