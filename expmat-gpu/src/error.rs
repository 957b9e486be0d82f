use expmat_core::MatrixError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("WGPU initialization failed: {0}")]
    WgpuInitError(String),

    #[error("WGPU error: {0}")]
    WgpuError(String),

    #[error("Invalid matrix dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Unsupported precision: {0}")]
    UnsupportedPrecision(String),

    #[error("GPU device has been disposed")]
    DeviceDisposed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GpuError> for MatrixError {
    fn from(err: GpuError) -> Self {
        MatrixError::Accelerator(Box::new(err))
    }
}
