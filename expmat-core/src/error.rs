use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatrixError>;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Matrix must be square (dims: {rows}x{cols})")]
    NotSquare { rows: usize, cols: usize },

    #[error("Invalid matrix shape: {0}")]
    InvalidShape(String),

    #[error("Matrix is singular")]
    SingularMatrix,

    #[error("Unsupported element type for this operation: {0}")]
    UnsupportedType(&'static str),

    #[error("{axis} index {index} is out of range (count: {count})")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        count: usize,
    },

    #[error("Sheet capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("No accelerator is bound to this matrix")]
    NoAccelerator,

    #[error("Invalid cell key '{0}', expected \"row,column\"")]
    InvalidKey(String),

    #[error("Cannot parse cell ({row}, {col}) value '{value}'")]
    Parse {
        row: usize,
        col: usize,
        value: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure raised by an accelerator backend, passed through as-is.
    #[error("Accelerator error: {0}")]
    Accelerator(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MatrixError {
    pub(crate) fn not_square(rows: usize, cols: usize) -> Self {
        MatrixError::NotSquare { rows, cols }
    }
}
