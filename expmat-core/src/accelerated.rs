use std::any::{type_name, Any};
use std::sync::Arc;

use crate::dense::DenseArray;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;
use crate::traits::{AcceleratorError, DotProductAccelerator, Element};

impl<T: Element> Matrix<T> {
    /// Binds an accelerator used by [`dot_product_accelerated`](Self::dot_product_accelerated).
    /// The handle is shared by clones of this matrix and released with the last of them.
    pub fn bind_accelerator(&mut self, accelerator: Arc<dyn DotProductAccelerator>) {
        self.accelerator = Some(accelerator);
    }

    pub fn unbind_accelerator(&mut self) -> Option<Arc<dyn DotProductAccelerator>> {
        self.accelerator.take()
    }

    pub fn accelerator(&self) -> Option<&Arc<dyn DotProductAccelerator>> {
        self.accelerator.as_ref()
    }

    /// Matrix product on the bound accelerator.
    pub fn dot_product_accelerated(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        let accelerator = self.accelerator.as_ref().ok_or(MatrixError::NoAccelerator)?;
        self.dot_product_with(other, accelerator.as_ref())
    }

    /// Matrix product computed by `accelerator`. Only `f32` and `f64` elements are
    /// supported; any other `T` fails with [`MatrixError::UnsupportedType`].
    ///
    /// Both operands are materialized densely (absent cells become zero), multiplied
    /// on the device, and the dense result is turned back into a sparse matrix that
    /// omits zero cells but keeps the full `rows(self) x cols(other)` size.
    pub fn dot_product_with(
        &self,
        other: &Matrix<T>,
        accelerator: &dyn DotProductAccelerator,
    ) -> Result<Matrix<T>> {
        let (lhs, rhs) = (self as &dyn Any, other as &dyn Any);

        if let (Some(a), Some(b)) = (
            lhs.downcast_ref::<Matrix<f32>>(),
            rhs.downcast_ref::<Matrix<f32>>(),
        ) {
            let product = device_product(a, b, |x, y| accelerator.matmul_f32(x, y))?;
            return recast(product);
        }
        if let (Some(a), Some(b)) = (
            lhs.downcast_ref::<Matrix<f64>>(),
            rhs.downcast_ref::<Matrix<f64>>(),
        ) {
            let product = device_product(a, b, |x, y| accelerator.matmul_f64(x, y))?;
            return recast(product);
        }
        Err(MatrixError::UnsupportedType(type_name::<T>()))
    }
}

fn device_product<F, K>(a: &Matrix<F>, b: &Matrix<F>, kernel: K) -> Result<Matrix<F>>
where
    F: Element,
    K: FnOnce(&DenseArray<F>, &DenseArray<F>) -> std::result::Result<DenseArray<F>, AcceleratorError>,
{
    let (m, k) = a.dims();
    let (k_other, n) = b.dims();
    if k != k_other {
        return Err(MatrixError::DimensionMismatch(format!(
            "Dot product needs columns of A ({}) to match rows of B ({})",
            k, k_other
        )));
    }
    log::debug!(
        "dot_product on accelerator: {}x{} · {}x{} ({})",
        m,
        k,
        k_other,
        n,
        type_name::<F>()
    );

    let dense = kernel(&a.to_array(), &b.to_array()).map_err(MatrixError::Accelerator)?;
    if dense.dims() != (m, n) {
        return Err(MatrixError::DimensionMismatch(format!(
            "Accelerator returned {}x{}, expected {}x{}",
            dense.rows(),
            dense.cols(),
            m,
            n
        )));
    }

    let result: Matrix<F> = a.derived(m, n);
    for (idx, value) in dense.into_vec().into_iter().enumerate() {
        if !value.is_zero_value() {
            result.store.set(idx / n, idx % n, value);
        }
    }
    Ok(result)
}

/// Moves a matrix whose element type is known to equal `T` back into `Matrix<T>`.
fn recast<U: Element, T: Element>(matrix: Matrix<U>) -> Result<Matrix<T>> {
    let boxed: Box<dyn Any> = Box::new(matrix);
    boxed
        .downcast::<Matrix<T>>()
        .map(|matrix| *matrix)
        .map_err(|_| MatrixError::UnsupportedType(type_name::<T>()))
}
