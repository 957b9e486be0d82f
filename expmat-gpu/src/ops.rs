// Host side of the dot product kernels: shape checks, buffer upload, dispatch and
// readback. Empty operands never reach the device.

use crate::context::GpuContext;
use crate::error::GpuError;
use crate::kernels::KernelSet;
use crate::precision::GpuFloat;
use crate::shaders::{MATVEC_WORKGROUP_SIZE, TILE_SIZE};
use bytemuck::{Pod, Zeroable};
use expmat_core::DenseArray;
use std::mem;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct KernelParams {
    m: u32,
    k: u32,
    n: u32,
    _padding: u32,
}

impl KernelParams {
    fn new(m: usize, k: usize, n: usize) -> Result<Self, GpuError> {
        Ok(Self {
            m: to_u32(m, "m")?,
            k: to_u32(k, "k")?,
            n: to_u32(n, "n")?,
            _padding: 0,
        })
    }
}

fn to_u32(value: usize, name: &str) -> Result<u32, GpuError> {
    u32::try_from(value).map_err(|_| {
        GpuError::InvalidDimensions(format!("{} = {} does not fit in a u32 index", name, value))
    })
}

fn workgroups(items: usize, per_group: u32) -> u32 {
    let per_group = per_group as usize;
    ((items + per_group - 1) / per_group).min(u32::MAX as usize) as u32
}

/// Rejects dispatches the device cannot launch or buffers it cannot bind.
fn check_limits(
    context: &GpuContext,
    dispatch: (u32, u32, u32),
    largest_buffer_bytes: u64,
) -> Result<(), GpuError> {
    let limits = context.device.limits();
    let max_groups = limits.max_compute_workgroups_per_dimension;
    if dispatch.0 > max_groups || dispatch.1 > max_groups || dispatch.2 > max_groups {
        return Err(GpuError::InvalidDimensions(format!(
            "Dispatch {:?} exceeds the device limit of {} workgroups per dimension",
            dispatch, max_groups
        )));
    }
    let max_binding = limits.max_storage_buffer_binding_size as u64;
    if largest_buffer_bytes > max_binding {
        return Err(GpuError::InvalidDimensions(format!(
            "Buffer of {} bytes exceeds the device binding limit of {} bytes",
            largest_buffer_bytes, max_binding
        )));
    }
    Ok(())
}

fn byte_len<F>(count: usize) -> u64 {
    (count * mem::size_of::<F>()) as u64
}

/// Uploads both operands, runs `pipeline` with `dispatch` workgroups and reads
/// `output_len` values back.
#[allow(clippy::too_many_arguments)]
async fn run_kernel<F: GpuFloat>(
    context: &GpuContext,
    kernels: &KernelSet,
    pipeline: &wgpu::ComputePipeline,
    label: &str,
    lhs: &[F],
    rhs: &[F],
    output_len: usize,
    params: KernelParams,
    dispatch: (u32, u32, u32),
) -> Result<Vec<F>, GpuError> {
    let largest = byte_len::<F>(lhs.len().max(rhs.len()).max(output_len));
    check_limits(context, dispatch, largest)?;

    let lhs_buffer = context.create_gpu_buffer_with_data(
        &format!("{} lhs", label),
        bytemuck::cast_slice(lhs),
        wgpu::BufferUsages::STORAGE,
    );
    let rhs_buffer = context.create_gpu_buffer_with_data(
        &format!("{} rhs", label),
        bytemuck::cast_slice(rhs),
        wgpu::BufferUsages::STORAGE,
    );
    let output_buffer = context.create_empty_buffer(
        &format!("{} result", label),
        byte_len::<F>(output_len),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
    );
    let params_buffer = context.create_gpu_buffer_with_data(
        &format!("{} params", label),
        bytemuck::bytes_of(&params),
        wgpu::BufferUsages::UNIFORM,
    );

    let bind_group = context
        .device
        .create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &kernels.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lhs_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: rhs_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: output_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(dispatch.0, dispatch.1, dispatch.2);
    }
    context.queue.submit(std::iter::once(encoder.finish()));

    context.read_buffer_to_cpu::<F>(&output_buffer, output_len).await
}

/// `C = A * B` with the tiled kernel.
pub(crate) async fn internal_matmul<F: GpuFloat>(
    context: &GpuContext,
    kernels: &KernelSet,
    a: &DenseArray<F>,
    b: &DenseArray<F>,
) -> Result<DenseArray<F>, GpuError> {
    let (m, k) = a.dims();
    let (k_b, n) = b.dims();
    if k != k_b {
        return Err(GpuError::InvalidDimensions(format!(
            "matmul needs columns of A ({}) to match rows of B ({})",
            k, k_b
        )));
    }
    if m == 0 || n == 0 || k == 0 {
        log::debug!("matmul {}x{}x{}: empty operand, skipping device", m, k, n);
        return Ok(DenseArray::filled(m, n, F::ZERO));
    }

    let dispatch = (
        workgroups(n, TILE_SIZE),
        workgroups(m, TILE_SIZE),
        1,
    );
    log::debug!(
        "matmul ({}) {}x{} · {}x{}, dispatch {:?}",
        kernels.precision.wgsl_type(),
        m,
        k,
        k_b,
        n,
        dispatch
    );
    let data = run_kernel(
        context,
        kernels,
        &kernels.matmul,
        "expmat matmul",
        a.as_slice(),
        b.as_slice(),
        m * n,
        KernelParams::new(m, k, n)?,
        dispatch,
    )
    .await?;
    DenseArray::from_vec(m, n, data).map_err(|e| GpuError::Internal(e.to_string()))
}

/// `x · y` with the single-invocation kernel.
pub(crate) async fn internal_dot<F: GpuFloat>(
    context: &GpuContext,
    kernels: &KernelSet,
    x: &[F],
    y: &[F],
) -> Result<F, GpuError> {
    if x.len() != y.len() {
        return Err(GpuError::InvalidDimensions(format!(
            "Vector sizes for dot product mismatch: {} != {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Ok(F::ZERO);
    }
    log::debug!("dot ({}) of length {}", kernels.precision.wgsl_type(), x.len());
    let data = run_kernel(
        context,
        kernels,
        &kernels.vector_dot,
        "expmat vector dot",
        x,
        y,
        1,
        KernelParams::new(0, x.len(), 0)?,
        (1, 1, 1),
    )
    .await?;
    data.first()
        .copied()
        .ok_or_else(|| GpuError::Internal("Empty readback for dot product".to_string()))
}

/// `A * x` with one invocation per row.
pub(crate) async fn internal_matvec<F: GpuFloat>(
    context: &GpuContext,
    kernels: &KernelSet,
    a: &DenseArray<F>,
    x: &[F],
) -> Result<Vec<F>, GpuError> {
    let (m, k) = a.dims();
    if k != x.len() {
        return Err(GpuError::InvalidDimensions(format!(
            "matvec needs columns of A ({}) to match vector length ({})",
            k,
            x.len()
        )));
    }
    if m == 0 || k == 0 {
        return Ok(vec![F::ZERO; m]);
    }
    let dispatch = (workgroups(m, MATVEC_WORKGROUP_SIZE), 1, 1);
    log::debug!(
        "matvec ({}) {}x{}, dispatch {:?}",
        kernels.precision.wgsl_type(),
        m,
        k,
        dispatch
    );
    run_kernel(
        context,
        kernels,
        &kernels.matvec,
        "expmat matvec",
        a.as_slice(),
        x,
        m,
        KernelParams::new(m, k, 1)?,
        dispatch,
    )
    .await
}
