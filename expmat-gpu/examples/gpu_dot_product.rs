use expmat_core::Matrix;
use expmat_gpu::{GpuDevice, TransferStats};
use std::sync::Arc;
use std::time::Instant;

/// Builds an n x n banded matrix: 4 on the diagonal, -1 on the first off-diagonals.
/// Everything else is left unwritten.
fn create_banded_matrix(n: usize) -> Matrix<f32> {
    let mut matrix = Matrix::zeros(n, n);
    for i in 0..n {
        matrix.set(i, i, 4.0);
        if i >= 1 {
            matrix.set(i, i - 1, -1.0);
        }
        if i + 1 < n {
            matrix.set(i, i + 1, -1.0);
        }
    }
    matrix
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("wgpu", log::LevelFilter::Off)
        .filter_module("naga", log::LevelFilter::Off)
        .init();

    let n = 256;
    log::info!("Setting up two {}x{} banded matrices...", n, n);
    let mut a = create_banded_matrix(n);
    let b = a.transpose().expect("transpose failed");

    let device = match pollster::block_on(GpuDevice::new()) {
        Ok(device) => Arc::new(device),
        Err(e) => {
            log::error!("No GPU device available: {}", e);
            return;
        }
    };
    log::info!("Using adapter: {}", device.adapter_info().name);
    a.bind_accelerator(device.clone());

    let start_time = Instant::now();
    let cpu = a.dot_product(&b).expect("CPU dot product failed");
    log::info!("CPU dot product: {:?}", start_time.elapsed());

    device.reset_transfer_stats();
    let start_time = Instant::now();
    let gpu = match a.dot_product_accelerated(&b) {
        Ok(product) => product,
        Err(e) => {
            log::error!("GPU dot product failed: {}", e);
            return;
        }
    };
    log::info!("GPU dot product: {:?}", start_time.elapsed());

    let TransferStats {
        bytes_to_gpu,
        bytes_from_gpu,
    } = device.get_transfer_stats();
    log::info!("GPU Transfer Stats:");
    log::info!("  Bytes CPU -> GPU: {}", bytes_to_gpu);
    log::info!("  Bytes GPU -> CPU: {}", bytes_from_gpu);

    let max_diff = cpu
        .to_array()
        .as_slice()
        .iter()
        .zip(gpu.to_array().as_slice())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max);
    log::info!("Result: {}x{}, {} stored cells", gpu.row_count(), gpu.column_count(), gpu.nnz());
    log::info!("Max |CPU - GPU| difference: {:e}", max_diff);

    device.dispose();
}
