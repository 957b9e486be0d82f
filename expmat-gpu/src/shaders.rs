//! WGSL source for the dot product kernels, generated per precision.
//!
//! All three entry points share one bind group layout:
//! `0` left operand, `1` right operand (both read-only storage), `2` output
//! (read-write storage) and `3` the `KernelParams` uniform `{ m, k, n }`.

use crate::precision::Precision;

/// Edge length of the square tiles staged in workgroup memory by `matmul_tiled`.
/// Also the workgroup size in x and y.
pub const TILE_SIZE: u32 = 2;

/// Workgroup size of `matvec`, one invocation per output row.
pub const MATVEC_WORKGROUP_SIZE: u32 = 64;

pub(crate) const MATMUL_ENTRY: &str = "matmul_tiled";
pub(crate) const VECTOR_DOT_ENTRY: &str = "vector_dot";
pub(crate) const MATVEC_ENTRY: &str = "matvec";

/// Generates the kernel module for `precision`.
pub fn kernel_source(precision: Precision) -> String {
    let t = precision.wgsl_type();
    let zero = precision.wgsl_zero();
    let tile = TILE_SIZE;

    format!(
        r#"// expmat dot product kernels ({t})

const TILE_SIZE: u32 = {tile}u;

struct KernelParams {{
    m: u32,
    k: u32,
    n: u32,
    _padding: u32,
}}

@group(0) @binding(0) var<storage, read> lhs: array<{t}>;
@group(0) @binding(1) var<storage, read> rhs: array<{t}>;
@group(0) @binding(2) var<storage, read_write> result: array<{t}>;
@group(0) @binding(3) var<uniform> params: KernelParams;

var<workgroup> tile_a: array<array<{t}, {tile}>, {tile}>;
var<workgroup> tile_b: array<array<{t}, {tile}>, {tile}>;

// C[m x n] = A[m x k] * B[k x n], row-major. Out-of-range tile cells are
// zero-padded so partial edge tiles contribute nothing.
@compute @workgroup_size({tile}, {tile}, 1)
fn {matmul}(@builtin(local_invocation_id) local_id: vec3<u32>,
            @builtin(workgroup_id) group_id: vec3<u32>) {{
    let row = group_id.y * TILE_SIZE + local_id.y;
    let col = group_id.x * TILE_SIZE + local_id.x;

    var sum: {t} = {zero};
    let num_tiles = (params.k + TILE_SIZE - 1u) / TILE_SIZE;

    for (var t_idx: u32 = 0u; t_idx < num_tiles; t_idx = t_idx + 1u) {{
        let a_col = t_idx * TILE_SIZE + local_id.x;
        if (row < params.m && a_col < params.k) {{
            tile_a[local_id.y][local_id.x] = lhs[row * params.k + a_col];
        }} else {{
            tile_a[local_id.y][local_id.x] = {zero};
        }}

        let b_row = t_idx * TILE_SIZE + local_id.y;
        if (b_row < params.k && col < params.n) {{
            tile_b[local_id.y][local_id.x] = rhs[b_row * params.n + col];
        }} else {{
            tile_b[local_id.y][local_id.x] = {zero};
        }}

        workgroupBarrier();

        for (var i: u32 = 0u; i < TILE_SIZE; i = i + 1u) {{
            sum = sum + tile_a[local_id.y][i] * tile_b[i][local_id.x];
        }}

        workgroupBarrier();
    }}

    if (row < params.m && col < params.n) {{
        result[row * params.n + col] = sum;
    }}
}}

// result[0] = sum(lhs[i] * rhs[i]) for i < k, in a single invocation.
@compute @workgroup_size(1)
fn {vector_dot}() {{
    var sum: {t} = {zero};
    for (var i: u32 = 0u; i < params.k; i = i + 1u) {{
        sum = sum + lhs[i] * rhs[i];
    }}
    result[0] = sum;
}}

// result[m] = A[m x k] * x[k], one invocation per row.
@compute @workgroup_size({matvec_wg})
fn {matvec}(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let row = global_id.x;
    if (row >= params.m) {{
        return;
    }}
    var sum: {t} = {zero};
    for (var j: u32 = 0u; j < params.k; j = j + 1u) {{
        sum = sum + lhs[row * params.k + j] * rhs[j];
    }}
    result[row] = sum;
}}
"#,
        t = t,
        zero = zero,
        tile = tile,
        matvec_wg = MATVEC_WORKGROUP_SIZE,
        matmul = MATMUL_ENTRY,
        vector_dot = VECTOR_DOT_ENTRY,
        matvec = MATVEC_ENTRY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_source() {
        let source = kernel_source(Precision::F32);
        assert!(source.contains("array<f32>"));
        assert!(source.contains("@workgroup_size(2, 2, 1)"));
        assert!(source.contains("var<workgroup> tile_a: array<array<f32, 2>, 2>;"));
        assert!(source.contains("fn matmul_tiled("));
        assert!(source.contains("fn vector_dot("));
        assert!(source.contains("fn matvec("));
        assert!(!source.contains("f64"));
    }

    #[test]
    fn test_f64_source_uses_double_literals() {
        let source = kernel_source(Precision::F64);
        assert!(source.contains("var sum: f64 = 0.0lf;"));
        assert!(!source.contains("f32"));
    }
}
