use bytemuck::Pod;
use expmat_core::Element;

/// Floating point width of a kernel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    F32,
    F64,
}

impl Precision {
    /// WGSL scalar type name.
    pub fn wgsl_type(self) -> &'static str {
        match self {
            Precision::F32 => "f32",
            Precision::F64 => "f64",
        }
    }

    /// WGSL zero literal of this width.
    pub(crate) fn wgsl_zero(self) -> &'static str {
        match self {
            Precision::F32 => "0.0",
            Precision::F64 => "0.0lf",
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Element types the device kernels operate on: `f32` and `f64`.
pub trait GpuFloat: Element + Pod + Copy + sealed::Sealed {
    const PRECISION: Precision;
    const ZERO: Self;
}

impl GpuFloat for f32 {
    const PRECISION: Precision = Precision::F32;
    const ZERO: Self = 0.0;
}

impl GpuFloat for f64 {
    const PRECISION: Precision = Precision::F64;
    const ZERO: Self = 0.0;
}
