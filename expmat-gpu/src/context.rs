use crate::error::GpuError;
use bytemuck::Pod;
use cfg_if::cfg_if;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use wgpu::{util::DeviceExt, PollType};

/// Adapter selection settings for [`GpuDevice`](crate::GpuDevice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuDeviceOptions {
    pub power_preference: wgpu::PowerPreference,
    /// Enable 64-bit float shaders when the adapter offers them.
    pub request_f64: bool,
}

impl Default for GpuDeviceOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            request_f64: true,
        }
    }
}

/// WGPU device and queue plus host/device transfer counters.
#[derive(Debug, Clone)]
pub(crate) struct GpuContext {
    pub(crate) device: Arc<wgpu::Device>,
    pub(crate) queue: Arc<wgpu::Queue>,
    pub(crate) adapter_info: wgpu::AdapterInfo,
    pub(crate) supports_f64: bool,
    /// Bytes uploaded through [`create_gpu_buffer_with_data`](Self::create_gpu_buffer_with_data).
    pub(crate) bytes_to_gpu: Arc<AtomicU64>,
    /// Bytes read back through [`read_buffer_to_cpu`](Self::read_buffer_to_cpu).
    pub(crate) bytes_from_gpu: Arc<AtomicU64>,
}

async fn request_adapter(
    instance: &wgpu::Instance,
    power_preference: wgpu::PowerPreference,
) -> Result<wgpu::Adapter, GpuError> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|_| GpuError::WgpuInitError("No suitable adapter found".to_string()))
}

impl GpuContext {
    pub(crate) async fn new(options: GpuDeviceOptions) -> Result<Self, GpuError> {
        log::debug!("Opening wgpu device");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = request_adapter(&instance, options.power_preference).await?;
        let adapter_info = adapter.get_info();
        log::info!(
            "Using adapter {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            options.power_preference
        );

        let f64_offered = adapter.features().contains(wgpu::Features::SHADER_F64);
        let required_features = if options.request_f64 && f64_offered {
            wgpu::Features::SHADER_F64
        } else {
            if options.request_f64 {
                log::warn!("Adapter does not offer SHADER_F64; f64 kernels are unavailable");
            }
            wgpu::Features::empty()
        };

        let mut limits = wgpu::Limits::default().using_resolution(adapter.limits());
        // Three storage buffers per kernel: two operands and the output.
        limits.max_storage_buffers_per_shader_stage =
            limits.max_storage_buffers_per_shader_stage.max(3);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("expmat device"),
                trace: wgpu::Trace::Off,
                memory_hints: wgpu::MemoryHints::Performance,
                required_features,
                required_limits: limits,
            })
            .await
            .map_err(|e| GpuError::WgpuInitError(format!("Failed to request device: {}", e)))?;

        let supports_f64 = device.features().contains(wgpu::Features::SHADER_F64);
        log::debug!("Device ready, f64 kernels {}", if supports_f64 { "on" } else { "off" });

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            supports_f64,
            bytes_to_gpu: Arc::new(AtomicU64::new(0)),
            bytes_from_gpu: Arc::new(AtomicU64::new(0)),
        })
    }

    /// True when some adapter can be obtained with `power_preference`.
    pub(crate) async fn probe(power_preference: wgpu::PowerPreference) -> bool {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        request_adapter(&instance, power_preference).await.is_ok()
    }

    /// Creates a buffer holding `contents` and counts the upload.
    pub(crate) fn create_gpu_buffer_with_data(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            });
        let total = count(&self.bytes_to_gpu, contents.len() as u64);
        log::trace!("upload '{}': {} bytes ({} total)", label, contents.len(), total);
        buffer
    }

    /// Creates an uninitialised buffer. Not counted as a transfer.
    pub(crate) fn create_empty_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        log::trace!("allocate '{}': {} bytes", label, size);
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Copies the first `element_count` values of `source` back to the host.
    /// `source` needs `COPY_SRC` usage.
    pub(crate) async fn read_buffer_to_cpu<T: Pod>(
        &self,
        source: &wgpu::Buffer,
        element_count: usize,
    ) -> Result<Vec<T>, GpuError> {
        let byte_len = (element_count * std::mem::size_of::<T>()) as u64;
        if byte_len == 0 {
            return Ok(Vec::new());
        }
        if source.size() < byte_len {
            return Err(GpuError::Internal(format!(
                "readback of {} bytes from a {} byte buffer",
                byte_len,
                source.size()
            )));
        }

        let staging = self.create_empty_buffer(
            "expmat staging",
            byte_len,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        );
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("expmat readback"),
            });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, byte_len);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |mapped| {
            // The receiver only disappears when the caller's future was dropped.
            let _ = sender.send(mapped);
        });

        cfg_if! {
            if #[cfg(not(target_arch = "wasm32"))] {
                self.device
                    .poll(PollType::Wait)
                    .map_err(|e| GpuError::WgpuError(format!("poll while mapping readback: {:?}", e)))?;
            }
        }

        receiver
            .await
            .map_err(|_| GpuError::Internal("readback mapping was abandoned".to_string()))?
            .map_err(|e| GpuError::WgpuError(format!("readback mapping: {}", e)))?;
        let values: Vec<T> = bytemuck::cast_slice(&slice.get_mapped_range()).to_vec();
        staging.unmap();

        let total = count(&self.bytes_from_gpu, byte_len);
        log::trace!("readback: {} bytes ({} total)", byte_len, total);
        Ok(values)
    }

    /// `(bytes uploaded, bytes read back)` since creation or the last reset.
    pub(crate) fn get_transfer_stats(&self) -> (u64, u64) {
        (
            self.bytes_to_gpu.load(Ordering::Relaxed),
            self.bytes_from_gpu.load(Ordering::Relaxed),
        )
    }

    pub(crate) fn reset_transfer_stats(&self) {
        self.bytes_to_gpu.store(0, Ordering::Relaxed);
        self.bytes_from_gpu.store(0, Ordering::Relaxed);
        log::debug!("transfer counters cleared");
    }
}

/// Adds `bytes` to `counter` and returns the new total.
fn count(counter: &AtomicU64, bytes: u64) -> u64 {
    counter.fetch_add(bytes, Ordering::Relaxed) + bytes
}
