//! WGSL source for the stable radix sort-pairs primitive.
//!
//! One shader module with three entry points, executed once per key bit:
//! per-block zero counting, a block-offset scan, and the stable split
//! scatter. All three share a single binding set so one bind group serves a
//! whole pass.

/// Elements processed per workgroup (one per invocation).
pub const SORT_BLOCK_SIZE: u32 = 256;

pub const RADIX_SORT_SHADER: &str = r#"// Stable binary-split radix sort, one bit per pass.

const WORKGROUP_SIZE: u32 = 256u;

struct SortPassParams {
    n: u32,
    bit: u32,
    num_blocks: u32,
    _pad0: u32,
}

@group(0) @binding(0) var<storage, read_write> keys_in: array<u32>;
@group(0) @binding(1) var<storage, read_write> vals_in: array<u32>;
@group(0) @binding(2) var<storage, read_write> keys_out: array<u32>;
@group(0) @binding(3) var<storage, read_write> vals_out: array<u32>;
@group(0) @binding(4) var<storage, read_write> block_zeros: array<u32>;
@group(0) @binding(5) var<storage, read_write> totals: array<u32>;
@group(0) @binding(6) var<uniform> params: SortPassParams;

var<workgroup> scan_buf: array<u32, 256>;

// Phase 1: count keys with a zero bit in each block.
@compute @workgroup_size(256)
fn radix_count(
    @builtin(workgroup_id) group_id: vec3<u32>,
    @builtin(local_invocation_id) local_id: vec3<u32>
) {
    let tid = local_id.x;
    let i = group_id.x * WORKGROUP_SIZE + tid;

    var flag = 0u;
    if (i < params.n && ((keys_in[i] >> params.bit) & 1u) == 0u) {
        flag = 1u;
    }

    scan_buf[tid] = flag;
    workgroupBarrier();

    for (var s = WORKGROUP_SIZE / 2u; s > 0u; s = s >> 1u) {
        if (tid < s) {
            scan_buf[tid] = scan_buf[tid] + scan_buf[tid + s];
        }
        workgroupBarrier();
    }

    if (tid == 0u) {
        block_zeros[group_id.x] = scan_buf[0];
    }
}

// Phase 2: exclusive scan of block counts, plus the grand total.
// Single workgroup; the block count is small (nnz / 256).
@compute @workgroup_size(256)
fn radix_block_scan(@builtin(local_invocation_id) local_id: vec3<u32>) {
    if (local_id.x == 0u) {
        var running = 0u;
        for (var b = 0u; b < params.num_blocks; b = b + 1u) {
            let count = block_zeros[b];
            block_zeros[b] = running;
            running = running + count;
        }
        totals[0] = running;
    }
}

// Phase 3: stable split. Zero-bit keys keep order at the front, one-bit keys
// keep order behind them.
@compute @workgroup_size(256)
fn radix_scatter(
    @builtin(workgroup_id) group_id: vec3<u32>,
    @builtin(local_invocation_id) local_id: vec3<u32>
) {
    let tid = local_id.x;
    let i = group_id.x * WORKGROUP_SIZE + tid;
    let valid = i < params.n;

    var key = 0u;
    var val = 0u;
    var flag = 0u;
    if (valid) {
        key = keys_in[i];
        val = vals_in[i];
        if (((key >> params.bit) & 1u) == 0u) {
            flag = 1u;
        }
    }

    // Inclusive Hillis-Steele scan of zero flags within the block.
    scan_buf[tid] = flag;
    workgroupBarrier();
    for (var d = 1u; d < WORKGROUP_SIZE; d = d << 1u) {
        var t = 0u;
        if (tid >= d) {
            t = scan_buf[tid - d];
        }
        workgroupBarrier();
        scan_buf[tid] = scan_buf[tid] + t;
        workgroupBarrier();
    }

    if (valid) {
        let zeros_before_block = block_zeros[group_id.x];
        let local_zeros = scan_buf[tid] - flag;
        var dst: u32;
        if (flag == 1u) {
            dst = zeros_before_block + local_zeros;
        } else {
            let block_start = group_id.x * WORKGROUP_SIZE;
            let ones_before_block = block_start - zeros_before_block;
            let local_ones = (i - block_start) - local_zeros;
            dst = totals[0] + ones_before_block + local_ones;
        }
        keys_out[dst] = key;
        vals_out[dst] = val;
    }
}
"#;
