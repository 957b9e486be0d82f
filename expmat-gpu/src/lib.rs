//! # expmat-gpu
//!
//! wgpu-backed dot product accelerator for `expmat-core` matrices.
//!
//! [`GpuDevice`] implements [`expmat_core::DotProductAccelerator`], so a device
//! can be bound to any `Matrix<f32>` or `Matrix<f64>` and used by
//! `Matrix::dot_product_accelerated`.

mod context;
pub mod device;
pub mod error;
mod kernels;
mod ops;
pub mod precision;
pub mod shaders;

pub use context::GpuDeviceOptions;
pub use device::{GpuDevice, TransferStats};
pub use error::GpuError;
pub use precision::{GpuFloat, Precision};
pub use shaders::TILE_SIZE;
