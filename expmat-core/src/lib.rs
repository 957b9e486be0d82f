//! # expmat-core
//!
//! Sparse, lazily expanding matrices with parallel CPU operations.
//!
//! A [`Matrix<T>`] stores only the cells that were written, reports a size that
//! grows with the largest written index, and runs its bulk operations on a
//! bounded worker pool ([`ParallelRange`]). Dense products can be offloaded to a
//! [`DotProductAccelerator`]; the `expmat-gpu` crate provides one backed by wgpu.

pub mod accelerated;
pub mod config;
pub mod dense;
pub mod error;
pub mod key;
pub mod linalg;
pub mod matrix;
pub mod ops;
pub mod parallel;
pub mod persistence;
pub mod store;
pub mod traits;

pub use config::{MatrixConfig, MAX_PARALLELISM_ENV};
pub use dense::DenseArray;
pub use error::{MatrixError, Result};
pub use key::MatrixKey;
pub use matrix::Matrix;
pub use parallel::{split_range, CancellationToken, ParallelRange};
pub use persistence::{MAX_SHEET_COLUMNS, MAX_SHEET_ROWS};
pub use store::SparseMatrixStore;
pub use traits::{AcceleratorError, DotProductAccelerator, Element};
