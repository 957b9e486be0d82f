use num_traits::Num;
use std::fmt::Debug;

use crate::dense::DenseArray;

/// Numeric capability required of matrix elements.
///
/// Anything implementing [`num_traits::Num`] qualifies: the primitive integer and
/// float types as well as exact types such as `num_rational::Ratio`. Arithmetic is
/// resolved at compile time, so there is no per-operation dispatch cost.
pub trait Element: Num + Clone + Debug + Send + Sync + 'static {
    fn is_zero_value(&self) -> bool {
        *self == Self::zero()
    }
}

impl<T> Element for T where T: Num + Clone + Debug + Send + Sync + 'static {}

/// Error type surfaced by accelerator backends.
pub type AcceleratorError = Box<dyn std::error::Error + Send + Sync>;

/// A device able to multiply dense row-major matrices.
///
/// `Matrix<T>` hands materialized operands to this trait for `T = f32` and
/// `T = f64`. Implementations own device selection, kernel compilation and
/// caching; the matrix only sees dense arrays going in and out.
pub trait DotProductAccelerator: Debug + Send + Sync {
    fn matmul_f32(
        &self,
        a: &DenseArray<f32>,
        b: &DenseArray<f32>,
    ) -> Result<DenseArray<f32>, AcceleratorError>;

    fn matmul_f64(
        &self,
        a: &DenseArray<f64>,
        b: &DenseArray<f64>,
    ) -> Result<DenseArray<f64>, AcceleratorError>;
}
