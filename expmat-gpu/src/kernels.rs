use crate::context::GpuContext;
use crate::error::GpuError;
use crate::precision::Precision;
use crate::shaders::{self, MATMUL_ENTRY, MATVEC_ENTRY, VECTOR_DOT_ENTRY};

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compiled pipelines of one precision, built once per device.
#[derive(Debug)]
pub(crate) struct KernelSet {
    pub(crate) precision: Precision,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) matmul: wgpu::ComputePipeline,
    pub(crate) vector_dot: wgpu::ComputePipeline,
    pub(crate) matvec: wgpu::ComputePipeline,
}

impl KernelSet {
    pub(crate) async fn new(context: &GpuContext, precision: Precision) -> Result<Self, GpuError> {
        let device = &context.device;
        log::info!("Compiling {} kernels", precision.wgsl_type());

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("expmat dot product kernels"),
            source: wgpu::ShaderSource::Wgsl(shaders::kernel_source(precision).into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("expmat kernel bind group layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("expmat kernel pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let matmul = pipeline(MATMUL_ENTRY);
        let vector_dot = pipeline(VECTOR_DOT_ENTRY);
        let matvec = pipeline(MATVEC_ENTRY);

        if let Some(err) = device.pop_error_scope().await {
            return Err(GpuError::WgpuError(format!(
                "Failed to build {} kernels: {}",
                precision.wgsl_type(),
                err
            )));
        }

        Ok(Self {
            precision,
            bind_group_layout,
            matmul,
            vector_dot,
            matvec,
        })
    }
}
