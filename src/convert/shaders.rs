//! WGSL sources for the transpose pipeline stages.
//!
//! Index arrays are bound as `array<u32>`; index payloads are non-negative
//! signed integers, so the bit patterns are interchangeable. Value arrays are
//! bound as `array<u32>` words and moved `words_per_element` at a time, which
//! keeps the gather dtype-agnostic (f64 and complex types included) without
//! any arithmetic on the payload.

/// Row-offset expansion: one lane per row writes that row's index into every
/// nonzero slot the row owns. Offsets carry the index base; output indices do
/// too.
pub const EXPAND_SHADER: &str = r#"// CSR row offsets -> explicit per-nonzero row indices.

struct ExpandParams {
    rows: u32,
    base: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read_write> row_offsets: array<u32>;
@group(0) @binding(1) var<storage, read_write> row_indices: array<u32>;
@group(0) @binding(2) var<uniform> params: ExpandParams;

@compute @workgroup_size(256)
fn expand_offsets(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let r = global_id.x;
    if (r >= params.rows) {
        return;
    }

    let start = row_offsets[r] - params.base;
    let end = row_offsets[r + 1u] - params.base;
    for (var p = start; p < end; p = p + 1u) {
        row_indices[p] = r + params.base;
    }
}
"#;

/// Offset collapse: one lane per column binary-searches the first occurrence
/// of its column in the sorted key array; the terminator lane writes the
/// total. No atomics, no ordering dependency between lanes.
pub const COLLAPSE_SHADER: &str = r#"// Sorted column keys -> CSC column offsets (lower bound per column).

struct CollapseParams {
    cols: u32,
    nnz: u32,
    base: u32,
    _pad0: u32,
}

@group(0) @binding(0) var<storage, read_write> sorted_keys: array<u32>;
@group(0) @binding(1) var<storage, read_write> col_offsets: array<u32>;
@group(0) @binding(2) var<uniform> params: CollapseParams;

@compute @workgroup_size(256)
fn collapse_keys(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let c = global_id.x;
    if (c > params.cols) {
        return;
    }
    if (c == params.cols) {
        col_offsets[c] = params.nnz + params.base;
        return;
    }

    let needle = c + params.base;
    var lo = 0u;
    var hi = params.nnz;
    while (lo < hi) {
        let mid = lo + (hi - lo) / 2u;
        if (sorted_keys[mid] < needle) {
            lo = mid + 1u;
        } else {
            hi = mid;
        }
    }
    col_offsets[c] = lo + params.base;
}
"#;

/// Identity permutation: perm[k] = k. Always zero-based; the permutation
/// indexes device arrays, never user-visible indices.
pub const IDENTITY_SHADER: &str = r#"// Identity permutation.

struct IdentityParams {
    n: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<storage, read_write> perm: array<u32>;
@group(0) @binding(1) var<uniform> params: IdentityParams;

@compute @workgroup_size(256)
fn identity_perm(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let k = global_id.x;
    if (k < params.n) {
        perm[k] = k;
    }
}
"#;

/// Permutation gather: output position k reads exclusively from input
/// position perm[k]. Read/write sets of distinct lanes are disjoint.
pub const GATHER_SHADER: &str = r#"// Apply a permutation to row indices and word-wise value payloads.

struct GatherParams {
    nnz: u32,
    words_per_elem: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read_write> perm: array<u32>;
@group(0) @binding(1) var<storage, read_write> rows_in: array<u32>;
@group(0) @binding(2) var<storage, read_write> vals_in: array<u32>;
@group(0) @binding(3) var<storage, read_write> rows_out: array<u32>;
@group(0) @binding(4) var<storage, read_write> vals_out: array<u32>;
@group(0) @binding(5) var<uniform> params: GatherParams;

@compute @workgroup_size(256)
fn permute_gather(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let k = global_id.x;
    if (k >= params.nnz) {
        return;
    }

    let src = perm[k];
    rows_out[k] = rows_in[src];

    let wpe = params.words_per_elem;
    for (var w = 0u; w < wpe; w = w + 1u) {
        vals_out[k * wpe + w] = vals_in[src * wpe + w];
    }
}
"#;

/// Constant fill, used by the zero-nnz fast path to emit an all-empty
/// offset array.
pub const FILL_SHADER: &str = r#"// Fill an array with one value.

struct FillParams {
    len: u32,
    value: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read_write> out: array<u32>;
@group(0) @binding(1) var<uniform> params: FillParams;

@compute @workgroup_size(256)
fn fill_value(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x;
    if (i < params.len) {
        out[i] = params.value;
    }
}
"#;
