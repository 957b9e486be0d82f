//! JSON and spreadsheet persistence.
//!
//! JSON documents carry the matrix size next to a `cells` object that maps
//! `"row,column"` keys to the stored values:
//! `{"rows":2,"columns":4,"cells":{"0,1":4.0}}`. Sheets are written as
//! `<dir>/<name>.csv`, one dense row per line, with absent cells left empty.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MatrixError, Result};
use crate::key::MatrixKey;
use crate::matrix::Matrix;
use crate::traits::Element;

/// Largest row count a sheet can hold.
pub const MAX_SHEET_ROWS: usize = 1_048_576;

/// Largest column count a sheet can hold.
pub const MAX_SHEET_COLUMNS: usize = 16_384;

#[derive(Debug, Serialize, Deserialize)]
struct MatrixDocument {
    rows: usize,
    columns: usize,
    cells: Map<String, Value>,
}

impl<T: Element + Serialize> Matrix<T> {
    /// Serializes the size and the stored cells, ordered by row then column.
    pub fn to_json(&self) -> Result<String> {
        let (rows, columns) = self.dims();
        let mut cells = Map::new();
        for (key, value) in self.store.snapshot() {
            cells.insert(key.to_string(), serde_json::to_value(&value)?);
        }
        let document = MatrixDocument {
            rows,
            columns,
            cells,
        };
        Ok(serde_json::to_string(&document)?)
    }
}

impl<T: Element + DeserializeOwned> Matrix<T> {
    /// Rebuilds a matrix from [`to_json`](Self::to_json) output.
    ///
    /// Cells outside the declared size are rejected with
    /// [`MatrixError::IndexOutOfRange`].
    pub fn from_json(json: &str) -> Result<Matrix<T>> {
        let document: MatrixDocument = serde_json::from_str(json)?;
        let matrix = Matrix::new();
        matrix.store.ensure_bounds(document.rows, document.columns);
        for (key, value) in document.cells {
            let key = MatrixKey::from_str(&key)?;
            if key.row() >= document.rows {
                return Err(MatrixError::IndexOutOfRange {
                    axis: "Row",
                    index: key.row(),
                    count: document.rows,
                });
            }
            if key.col() >= document.columns {
                return Err(MatrixError::IndexOutOfRange {
                    axis: "Column",
                    index: key.col(),
                    count: document.columns,
                });
            }
            matrix
                .store
                .set(key.row(), key.col(), serde_json::from_value(value)?);
        }
        log::debug!(
            "from_json: {} cells, {}x{}",
            matrix.nnz(),
            matrix.row_count(),
            matrix.column_count()
        );
        Ok(matrix)
    }
}

fn sheet_path(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(MatrixError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid sheet name '{}'", name),
        )));
    }
    Ok(dir.join(format!("{}.csv", name)))
}

impl<T: Element + Display> Matrix<T> {
    /// Writes the matrix as sheet `name` under `dir` and returns the file path.
    ///
    /// A sheet has no way to express rows without columns, so a `rows x 0` matrix
    /// is written as an empty file and loads back as 0x0.
    ///
    /// Fails with [`MatrixError::CapacityExceeded`] before touching the file system
    /// when the matrix does not fit in a sheet.
    pub fn save_sheet(&self, dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
        let (rows, cols) = self.dims();
        if rows > MAX_SHEET_ROWS {
            return Err(MatrixError::CapacityExceeded(format!(
                "{} rows exceed the sheet limit of {}",
                rows, MAX_SHEET_ROWS
            )));
        }
        if cols > MAX_SHEET_COLUMNS {
            return Err(MatrixError::CapacityExceeded(format!(
                "{} columns exceed the sheet limit of {}",
                cols, MAX_SHEET_COLUMNS
            )));
        }

        let path = sheet_path(dir.as_ref(), name)?;
        log::debug!("save_sheet: {}x{} to {}", rows, cols, path.display());
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        if cols > 0 {
            for r in 0..rows {
                let record: Vec<String> = (0..cols)
                    .map(|c| {
                        if self.store.contains(r, c) {
                            self.get(r, c).to_string()
                        } else {
                            String::new()
                        }
                    })
                    .collect();
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
        Ok(path)
    }
}

impl<T: Element + FromStr> Matrix<T> {
    /// Reads sheet `name` from `dir`. Empty and zero cells are not stored, but the
    /// sheet's full size is kept.
    pub fn load_sheet(dir: impl AsRef<Path>, name: &str) -> Result<Matrix<T>> {
        let path = sheet_path(dir.as_ref(), name)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        let matrix = Matrix::new();
        for (r, record) in reader.records().enumerate() {
            let record = record?;
            for (c, field) in record.iter().enumerate() {
                let field = field.trim();
                if field.is_empty() {
                    continue;
                }
                let value = field.parse::<T>().map_err(|_| MatrixError::Parse {
                    row: r,
                    col: c,
                    value: field.to_string(),
                })?;
                if !value.is_zero_value() {
                    matrix.store.set(r, c, value);
                }
            }
            matrix.store.ensure_bounds(r + 1, record.len());
        }
        log::debug!(
            "load_sheet: {}x{} from {}",
            matrix.row_count(),
            matrix.column_count(),
            path.display()
        );
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "expmat-persistence-{}-{}",
            std::process::id(),
            label
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_json_keys_and_order() {
        let mut matrix = Matrix::new();
        matrix.set(1, 0, 2.5);
        matrix.set(0, 3, -1.0);
        matrix.set(0, 1, 4.0);
        let json = matrix.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"rows":2,"columns":4,"cells":{"0,1":4.0,"0,3":-1.0,"1,0":2.5}}"#
        );

        let back: Matrix<f64> = Matrix::from_json(&json).unwrap();
        assert_eq!(back, matrix);
        assert_eq!(back.dims(), (2, 4));
    }

    #[test]
    fn test_json_keeps_size_of_zero_tail() {
        let mut matrix = Matrix::zeros(3, 3);
        matrix.set(0, 0, 1.0);
        let back: Matrix<f64> = Matrix::from_json(&matrix.to_json().unwrap()).unwrap();
        assert_eq!(back.dims(), (3, 3));
        assert_eq!(back, matrix);

        let identity: Matrix<f64> = Matrix::identity(4);
        let zero = identity.subtract(&identity).unwrap();
        let json = zero.to_json().unwrap();
        assert_eq!(json, r#"{"rows":4,"columns":4,"cells":{}}"#);
        let back: Matrix<f64> = Matrix::from_json(&json).unwrap();
        assert_eq!(back.dims(), (4, 4));
        assert_eq!(back, zero);
    }

    #[test]
    fn test_json_rejects_bad_keys_and_values() {
        assert!(matches!(
            Matrix::<i32>::from_json(r#"{"rows":3,"columns":3,"cells":{"1;2": 3}}"#),
            Err(MatrixError::InvalidKey(_))
        ));
        assert!(matches!(
            Matrix::<i32>::from_json(r#"{"rows":3,"columns":3,"cells":{"1,2": "three"}}"#),
            Err(MatrixError::Json(_))
        ));
        assert!(matches!(
            Matrix::<i32>::from_json(r#"{"rows":2,"columns":3,"cells":{"2,0": 1}}"#),
            Err(MatrixError::IndexOutOfRange { axis: "Row", index: 2, count: 2 })
        ));
        assert!(matches!(
            Matrix::<i32>::from_json(r#"{"rows":2,"columns":3,"cells":{"0,3": 1}}"#),
            Err(MatrixError::IndexOutOfRange { axis: "Column", .. })
        ));
        assert!(matches!(
            Matrix::<i32>::from_json(r#"{"1,2": 3}"#),
            Err(MatrixError::Json(_))
        ));
        assert!(matches!(
            Matrix::<i32>::from_json("not json"),
            Err(MatrixError::Json(_))
        ));
    }

    #[test]
    fn test_sheet_round_trip_keeps_size() {
        let dir = scratch_dir("round-trip");
        let mut matrix = Matrix::zeros(3, 4);
        matrix.set(0, 0, 1i64);
        matrix.set(1, 2, -7);

        let path = matrix.save_sheet(&dir, "values").unwrap();
        assert_eq!(path, dir.join("values.csv"));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("1,,,"));

        let loaded: Matrix<i64> = Matrix::load_sheet(&dir, "values").unwrap();
        assert_eq!(loaded.dims(), (3, 4));
        assert_eq!(loaded, matrix);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_json_rejects_unrepresentable_index() {
        let json = r#"{"rows":1,"columns":1,"cells":{"18446744073709551615,0": 1}}"#;
        assert!(matches!(
            Matrix::<i32>::from_json(json),
            Err(MatrixError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_sheet_without_columns_loads_empty() {
        let dir = scratch_dir("no-columns");
        let matrix: Matrix<i64> = Matrix::zeros(3, 0);
        let path = matrix.save_sheet(&dir, "bare").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        let loaded: Matrix<i64> = Matrix::load_sheet(&dir, "bare").unwrap();
        assert_eq!(loaded.dims(), (0, 0));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sheet_parse_error_reports_cell() {
        let dir = scratch_dir("parse-error");
        fs::write(dir.join("broken.csv"), "1,2\n3,x\n").unwrap();
        match Matrix::<i32>::load_sheet(&dir, "broken") {
            Err(MatrixError::Parse { row, col, value }) => {
                assert_eq!((row, col), (1, 1));
                assert_eq!(value, "x");
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sheet_capacity_checked_before_write() {
        let dir = scratch_dir("capacity");
        let wide: Matrix<f64> = Matrix::zeros(1, MAX_SHEET_COLUMNS + 1);
        match wide.save_sheet(&dir, "wide") {
            Err(MatrixError::CapacityExceeded(msg)) => assert!(msg.contains("columns")),
            other => panic!("Expected CapacityExceeded, got {:?}", other),
        }
        let tall: Matrix<f64> = Matrix::zeros(MAX_SHEET_ROWS + 1, 1);
        assert!(matches!(
            tall.save_sheet(&dir, "tall"),
            Err(MatrixError::CapacityExceeded(_))
        ));
        assert!(!dir.join("wide.csv").exists());
        assert!(!dir.join("tall.csv").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sheet_name_validation() {
        let matrix: Matrix<f64> = Matrix::identity(1);
        assert!(matrix.save_sheet(std::env::temp_dir(), "../escape").is_err());
        assert!(matrix.save_sheet(std::env::temp_dir(), "").is_err());
    }
}
