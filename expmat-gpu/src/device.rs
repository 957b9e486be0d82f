use crate::context::{GpuContext, GpuDeviceOptions};
use crate::error::GpuError;
use crate::kernels::KernelSet;
use crate::ops;
use crate::precision::{GpuFloat, Precision};
use expmat_core::{AcceleratorError, DenseArray, DotProductAccelerator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type KernelSlot = Mutex<Option<Arc<KernelSet>>>;

/// GPU accelerator handle.
///
/// Owns a wgpu device and queue together with the compiled kernels for each
/// precision, which are built on first use and reused by every later call.
/// Share it between matrices through `Arc` (see
/// `Matrix::bind_accelerator`); call [`dispose`](Self::dispose) to release the
/// device early.
#[derive(Debug)]
pub struct GpuDevice {
    pub(crate) context: Arc<GpuContext>,
    f32_kernels: KernelSlot,
    f64_kernels: KernelSlot,
    disposed: AtomicBool,
}

impl GpuDevice {
    /// Creates a device with [`GpuDeviceOptions::default`].
    pub async fn new() -> Result<Self, GpuError> {
        Self::with_options(GpuDeviceOptions::default()).await
    }

    pub async fn with_options(options: GpuDeviceOptions) -> Result<Self, GpuError> {
        let context = GpuContext::new(options).await?;
        log::info!("GpuDevice created successfully");
        Ok(Self {
            context: Arc::new(context),
            f32_kernels: Mutex::new(None),
            f64_kernels: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }

    /// True when a GPU adapter can be obtained on this machine.
    pub fn is_available() -> bool {
        pollster::block_on(GpuContext::probe(wgpu::PowerPreference::HighPerformance))
    }

    /// True when 64-bit float kernels can run on this device.
    pub fn supports_f64(&self) -> bool {
        self.context.supports_f64
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.context.adapter_info
    }

    fn slot(&self, precision: Precision) -> &KernelSlot {
        match precision {
            Precision::F32 => &self.f32_kernels,
            Precision::F64 => &self.f64_kernels,
        }
    }

    fn cached_kernels(&self, precision: Precision) -> Option<Arc<KernelSet>> {
        self.slot(precision)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Kernels for `F`, compiled on first use.
    async fn kernels<F: GpuFloat>(&self) -> Result<Arc<KernelSet>, GpuError> {
        if self.is_disposed() {
            return Err(GpuError::DeviceDisposed);
        }
        let precision = F::PRECISION;
        if precision == Precision::F64 && !self.supports_f64() {
            return Err(GpuError::UnsupportedPrecision(
                "f64 kernels need the SHADER_F64 feature, which this device lacks".to_string(),
            ));
        }
        if let Some(kernels) = self.cached_kernels(precision) {
            return Ok(kernels);
        }

        let built = Arc::new(KernelSet::new(&self.context, precision).await?);
        let mut slot = self.slot(precision).lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished compiling first; keep its set.
        let kernels = slot.get_or_insert_with(|| built).clone();
        Ok(kernels)
    }

    /// Dense product `a * b`.
    pub async fn matmul<F: GpuFloat>(
        &self,
        a: &DenseArray<F>,
        b: &DenseArray<F>,
    ) -> Result<DenseArray<F>, GpuError> {
        let kernels = self.kernels::<F>().await?;
        ops::internal_matmul(&self.context, &kernels, a, b).await
    }

    /// Dot product of two equally long vectors.
    pub async fn dot<F: GpuFloat>(&self, x: &[F], y: &[F]) -> Result<F, GpuError> {
        let kernels = self.kernels::<F>().await?;
        ops::internal_dot(&self.context, &kernels, x, y).await
    }

    /// Matrix-vector product `a * x`.
    pub async fn matvec<F: GpuFloat>(&self, a: &DenseArray<F>, x: &[F]) -> Result<Vec<F>, GpuError> {
        let kernels = self.kernels::<F>().await?;
        ops::internal_matvec(&self.context, &kernels, a, x).await
    }

    /// Drops the cached kernels and destroys the device. Later operations fail
    /// with [`GpuError::DeviceDisposed`]. Calling it again has no effect.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for precision in [Precision::F32, Precision::F64] {
            self.slot(precision)
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
        }
        self.context.device.destroy();
        log::info!("GpuDevice disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns the bytes moved between host and device so far.
    pub fn get_transfer_stats(&self) -> TransferStats {
        let (bytes_to_gpu, bytes_from_gpu) = self.context.get_transfer_stats();
        TransferStats {
            bytes_to_gpu,
            bytes_from_gpu,
        }
    }

    pub fn reset_transfer_stats(&self) {
        self.context.reset_transfer_stats();
    }
}

impl DotProductAccelerator for GpuDevice {
    fn matmul_f32(
        &self,
        a: &DenseArray<f32>,
        b: &DenseArray<f32>,
    ) -> Result<DenseArray<f32>, AcceleratorError> {
        pollster::block_on(self.matmul(a, b)).map_err(Into::into)
    }

    fn matmul_f64(
        &self,
        a: &DenseArray<f64>,
        b: &DenseArray<f64>,
    ) -> Result<DenseArray<f64>, AcceleratorError> {
        pollster::block_on(self.matmul(a, b)).map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub bytes_to_gpu: u64,
    pub bytes_from_gpu: u64,
}
