use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{MatrixError, Result};
use crate::key::MatrixKey;
use crate::traits::Element;

/// Thread-safe sparse cell storage keyed by [`MatrixKey`].
///
/// Absent cells read as `T::zero()`. The store tracks its logical bounds so the
/// matrix size is available without scanning: `row_count` is one past the largest
/// row ever written (likewise for columns), and only shrinks through
/// [`delete_row`](Self::delete_row), [`delete_column`](Self::delete_column) or
/// [`clear`](Self::clear).
#[derive(Debug)]
pub struct SparseMatrixStore<T> {
    cells: DashMap<MatrixKey, T>,
    rows: AtomicUsize,
    cols: AtomicUsize,
}

impl<T: Element> Default for SparseMatrixStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> SparseMatrixStore<T> {
    /// Creates an empty store with bounds (0, 0).
    pub fn new() -> Self {
        Self::with_bounds(0, 0)
    }

    /// Creates an empty store that already reports `rows x cols`.
    pub fn with_bounds(rows: usize, cols: usize) -> Self {
        SparseMatrixStore {
            cells: DashMap::new(),
            rows: AtomicUsize::new(rows),
            cols: AtomicUsize::new(cols),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.load(Ordering::Acquire)
    }

    pub fn column_count(&self) -> usize {
        self.cols.load(Ordering::Acquire)
    }

    /// Number of explicitly stored cells.
    pub fn nnz(&self) -> usize {
        self.cells.len()
    }

    /// Returns the value at `(row, col)`, or zero when the cell was never written.
    pub fn get(&self, row: usize, col: usize) -> T {
        self.cells
            .get(&MatrixKey::new(row, col))
            .map(|cell| cell.value().clone())
            .unwrap_or_else(T::zero)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells.contains_key(&MatrixKey::new(row, col))
    }

    /// Inserts or overwrites `(row, col)`, growing the bounds when needed.
    ///
    /// Bounds saturate at `usize::MAX`.
    pub fn set(&self, row: usize, col: usize, value: T) {
        self.cells.insert(MatrixKey::new(row, col), value);
        self.rows.fetch_max(row.saturating_add(1), Ordering::AcqRel);
        self.cols.fetch_max(col.saturating_add(1), Ordering::AcqRel);
    }

    /// Grows the reported bounds without storing any cell.
    pub(crate) fn ensure_bounds(&self, rows: usize, cols: usize) {
        self.rows.fetch_max(rows, Ordering::AcqRel);
        self.cols.fetch_max(cols, Ordering::AcqRel);
    }

    /// Copy of every stored cell, ordered by row then column.
    ///
    /// The copy is detached from the store, so callers may iterate it while other
    /// threads keep writing.
    pub fn snapshot(&self) -> Vec<(MatrixKey, T)> {
        let mut entries: Vec<(MatrixKey, T)> = self
            .cells
            .iter()
            .map(|cell| (*cell.key(), cell.value().clone()))
            .collect();
        entries.sort_unstable_by_key(|(key, _)| *key);
        entries
    }

    /// Removes every cell and resets the bounds to (0, 0).
    pub fn clear(&self) {
        self.cells.clear();
        self.rows.store(0, Ordering::Release);
        self.cols.store(0, Ordering::Release);
    }

    /// Removes row `index`, shifting every later row up by one.
    pub fn delete_row(&self, index: usize) -> Result<()> {
        let count = self.row_count();
        if index >= count {
            return Err(MatrixError::IndexOutOfRange {
                axis: "Row",
                index,
                count,
            });
        }
        self.rebuild(|key| match key.row() {
            r if r == index => None,
            r if r > index => Some(MatrixKey::new(r - 1, key.col())),
            _ => Some(key),
        });
        self.rows.store(count - 1, Ordering::Release);
        Ok(())
    }

    /// Removes column `index`, shifting every later column left by one.
    pub fn delete_column(&self, index: usize) -> Result<()> {
        let count = self.column_count();
        if index >= count {
            return Err(MatrixError::IndexOutOfRange {
                axis: "Column",
                index,
                count,
            });
        }
        self.rebuild(|key| match key.col() {
            c if c == index => None,
            c if c > index => Some(MatrixKey::new(key.row(), c - 1)),
            _ => Some(key),
        });
        self.cols.store(count - 1, Ordering::Release);
        Ok(())
    }

    /// Inserts an empty row at `index`; rows at or after `index` move down by one.
    /// `index` may equal the current row count to append.
    pub fn insert_empty_row(&self, index: usize) -> Result<()> {
        let count = self.row_count();
        if index > count {
            return Err(MatrixError::IndexOutOfRange {
                axis: "Row",
                index,
                count,
            });
        }
        self.rebuild(|key| match key.row() {
            r if r >= index => Some(MatrixKey::new(r + 1, key.col())),
            _ => Some(key),
        });
        self.rows.store(count + 1, Ordering::Release);
        Ok(())
    }

    /// Inserts an empty column at `index`; columns at or after `index` move right.
    pub fn insert_empty_column(&self, index: usize) -> Result<()> {
        let count = self.column_count();
        if index > count {
            return Err(MatrixError::IndexOutOfRange {
                axis: "Column",
                index,
                count,
            });
        }
        self.rebuild(|key| match key.col() {
            c if c >= index => Some(MatrixKey::new(key.row(), c + 1)),
            _ => Some(key),
        });
        self.cols.store(count + 1, Ordering::Release);
        Ok(())
    }

    /// Re-keys every cell through `remap`; cells mapped to `None` are dropped.
    fn rebuild(&self, remap: impl Fn(MatrixKey) -> Option<MatrixKey>) {
        let entries = self.snapshot();
        self.cells.clear();
        for (key, value) in entries {
            if let Some(new_key) = remap(key) {
                self.cells.insert(new_key, value);
            }
        }
    }
}

impl<T: Element> Clone for SparseMatrixStore<T> {
    fn clone(&self) -> Self {
        let cloned = Self::with_bounds(self.row_count(), self.column_count());
        for (key, value) in self.snapshot() {
            cloned.cells.insert(key, value);
        }
        cloned
    }
}
