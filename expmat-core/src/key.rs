use std::fmt;
use std::str::FromStr;

use crate::error::MatrixError;

/// Immutable `(row, column)` coordinate of a matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatrixKey {
    row: usize,
    col: usize,
}

impl MatrixKey {
    pub fn new(row: usize, col: usize) -> Self {
        MatrixKey { row, col }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }
}

impl From<(usize, usize)> for MatrixKey {
    fn from((row, col): (usize, usize)) -> Self {
        MatrixKey::new(row, col)
    }
}

/// Formats as `"row,column"`, the form used by the JSON persistence layer.
impl fmt::Display for MatrixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Parses `"row,column"`. `usize::MAX` is rejected on either axis because the
/// matrix size one past it cannot be represented.
impl FromStr for MatrixKey {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MatrixError::InvalidKey(s.to_string());
        let (row, col) = s.split_once(',').ok_or_else(invalid)?;
        let row = row.trim().parse::<usize>().map_err(|_| invalid())?;
        let col = col.trim().parse::<usize>().map_err(|_| invalid())?;
        if row == usize::MAX || col == usize::MAX {
            return Err(invalid());
        }
        Ok(MatrixKey::new(row, col))
    }
}
