// Element-wise arithmetic, transpose, matrix product and diagonal helpers.
// Every operation validates shapes before any parallel work starts and writes
// its output into a fresh matrix; workers own disjoint output rows or columns.

use crate::error::{MatrixError, Result};
use crate::matrix::{ensure_same_dims, ensure_square, Matrix};
use crate::traits::Element;

impl<T: Element> Matrix<T> {
    fn zip_with<F>(&self, other: &Matrix<T>, op: &str, f: F) -> Result<Matrix<T>>
    where
        F: Fn(T, T) -> T + Send + Sync,
    {
        ensure_same_dims(op, self, other)?;
        let (rows, cols) = self.dims();
        log::debug!("{} over {}x{}", op, rows, cols);
        let result: Matrix<T> = self.derived(rows, cols);
        self.parallel().for_each(0, rows, |r| {
            for c in 0..cols {
                let value = f(self.get(r, c), other.get(r, c));
                if !value.is_zero_value() {
                    result.store.set(r, c, value);
                }
            }
            Ok(())
        })?;
        Ok(result)
    }

    fn map_all<F>(&self, op: &str, f: F) -> Result<Matrix<T>>
    where
        F: Fn(T) -> T + Send + Sync,
    {
        let (rows, cols) = self.dims();
        log::debug!("{} over {}x{}", op, rows, cols);
        let result: Matrix<T> = self.derived(rows, cols);
        self.parallel().for_each(0, rows, |r| {
            for c in 0..cols {
                let value = f(self.get(r, c));
                if !value.is_zero_value() {
                    result.store.set(r, c, value);
                }
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Element-wise sum. Both matrices must have the same size.
    pub fn add(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// Element-wise difference. Both matrices must have the same size.
    pub fn subtract(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    /// Multiplies every element by `scalar`.
    pub fn multiply_scalar(&self, scalar: &T) -> Result<Matrix<T>> {
        self.map_all("multiply_scalar", |v| v * scalar.clone())
    }

    /// Adds `scalar` to every element, including cells that were never written.
    pub fn add_scalar(&self, scalar: &T) -> Result<Matrix<T>> {
        self.map_all("add_scalar", |v| v + scalar.clone())
    }

    /// Returns a copy of the matrix. Elements are real-valued, so conjugation leaves
    /// every value unchanged; a complex element type would need it here.
    pub fn conjugate(&self) -> Result<Matrix<T>> {
        self.map_all("conjugate", |v| v)
    }

    /// Swaps rows and columns. Work is split over the source columns.
    pub fn transpose(&self) -> Result<Matrix<T>> {
        let (rows, cols) = self.dims();
        log::debug!("transpose of {}x{}", rows, cols);
        let result: Matrix<T> = self.derived(cols, rows);
        self.parallel().for_each(0, cols, |c| {
            for r in 0..rows {
                if self.store.contains(r, c) {
                    result.store.set(c, r, self.get(r, c));
                }
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Matrix product `self · other` on the CPU, parallel over the rows of `self`.
    pub fn dot_product(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        let (m, k) = self.dims();
        let (k_other, n) = other.dims();
        if k != k_other {
            return Err(MatrixError::DimensionMismatch(format!(
                "Dot product needs columns of A ({}) to match rows of B ({})",
                k, k_other
            )));
        }
        log::debug!("dot_product {}x{} · {}x{}", m, k, k_other, n);
        let result: Matrix<T> = self.derived(m, n);
        self.parallel().for_each(0, m, |i| {
            let row: Vec<T> = (0..k).map(|p| self.get(i, p)).collect();
            for j in 0..n {
                let mut sum = T::zero();
                for (p, a) in row.iter().enumerate() {
                    if !a.is_zero_value() {
                        sum = sum + a.clone() * other.get(p, j);
                    }
                }
                if !sum.is_zero_value() {
                    result.store.set(i, j, sum);
                }
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Builds a square matrix whose diagonal is the first column of `vector`.
    pub fn diag(vector: &Matrix<T>) -> Result<Matrix<T>> {
        if vector.column_count() > 1 {
            return Err(MatrixError::InvalidShape(format!(
                "diag expects a column vector, got {}x{}",
                vector.row_count(),
                vector.column_count()
            )));
        }
        let n = vector.row_count();
        let result: Matrix<T> = vector.derived(n, n);
        vector.parallel().for_each(0, n, |i| {
            if vector.store.contains(i, 0) {
                result.store.set(i, i, vector.get(i, 0));
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Extracts the diagonal of a square matrix as a column vector.
    pub fn diag_vector(&self) -> Result<Matrix<T>> {
        let n = ensure_square(self)?;
        let result: Matrix<T> = self.derived(n, n.min(1));
        self.parallel().for_each(0, n, |i| {
            if self.store.contains(i, i) {
                result.store.set(i, 0, self.get(i, i));
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Sum of the diagonal of a square matrix.
    pub fn trace(&self) -> Result<T> {
        let n = ensure_square(self)?;
        let diagonal = self.parallel().try_map(0, n, |i| Ok(self.get(i, i)))?;
        Ok(diagonal.into_iter().fold(T::zero(), |acc, v| acc + v))
    }
}
