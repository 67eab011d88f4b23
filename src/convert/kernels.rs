//! Launchers for the transpose pipeline kernels.
//!
//! Each launcher builds its bind group, records one compute pass, and submits
//! it on the context queue. Nothing here blocks; kernels from consecutive
//! launches execute in submission order.

use crate::context::SparseContext;
use crate::pipeline::{BufRegion, LayoutKey, workgroup_count};

use super::shaders::{
    COLLAPSE_SHADER, EXPAND_SHADER, FILL_SHADER, GATHER_SHADER, IDENTITY_SHADER,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ExpandParams {
    rows: u32,
    base: u32,
    _pad0: u32,
    _pad1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CollapseParams {
    cols: u32,
    nnz: u32,
    base: u32,
    _pad0: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct IdentityParams {
    n: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GatherParams {
    nnz: u32,
    words_per_elem: u32,
    _pad0: u32,
    _pad1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FillParams {
    len: u32,
    value: u32,
    _pad0: u32,
    _pad1: u32,
}

fn dispatch(
    ctx: &SparseContext,
    shader_name: &'static str,
    source: &'static str,
    entry_point: &'static str,
    regions: &[BufRegion],
    lanes: u64,
) {
    let cache = ctx.pipeline_cache();
    let module = cache.get_or_create_module(shader_name, source);
    let layout = cache.get_or_create_layout(LayoutKey {
        num_storage_buffers: regions.len() as u32 - 1,
        num_uniform_buffers: 1,
    });
    let pipeline = cache.get_or_create_pipeline(shader_name, entry_point, &module, &layout);
    let bind_group = cache.create_bind_group(&layout, regions);

    let mut encoder = cache
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(shader_name),
        });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(entry_point),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, Some(&bind_group), &[]);
        pass.dispatch_workgroups(workgroup_count(lanes), 1, 1);
    }
    ctx.queue().submit(std::iter::once(encoder.finish()));
}

/// Expand `rows + 1` offsets into one row index per nonzero.
pub fn launch_expand_offsets(
    ctx: &SparseContext,
    row_offsets: BufRegion,
    row_indices: BufRegion,
    rows: u64,
    base: u32,
) {
    let params = ExpandParams {
        rows: rows as u32,
        base,
        _pad0: 0,
        _pad1: 0,
    };
    let params_buffer = ctx.create_params_buffer("expand_offsets_params", &params);
    dispatch(
        ctx,
        "expand_offsets",
        EXPAND_SHADER,
        "expand_offsets",
        &[row_offsets, row_indices, BufRegion::whole(&params_buffer)],
        rows,
    );
}

/// Collapse sorted column keys into `cols + 1` CSC offsets.
pub fn launch_collapse_keys(
    ctx: &SparseContext,
    sorted_keys: BufRegion,
    col_offsets: BufRegion,
    cols: u64,
    nnz: u64,
    base: u32,
) {
    let params = CollapseParams {
        cols: cols as u32,
        nnz: nnz as u32,
        base,
        _pad0: 0,
    };
    let params_buffer = ctx.create_params_buffer("collapse_keys_params", &params);
    dispatch(
        ctx,
        "collapse_keys",
        COLLAPSE_SHADER,
        "collapse_keys",
        &[sorted_keys, col_offsets, BufRegion::whole(&params_buffer)],
        cols + 1,
    );
}

/// Write the identity permutation into `perm`.
pub fn launch_identity_perm(ctx: &SparseContext, perm: BufRegion, n: u64) {
    let params = IdentityParams {
        n: n as u32,
        _pad0: 0,
        _pad1: 0,
        _pad2: 0,
    };
    let params_buffer = ctx.create_params_buffer("identity_perm_params", &params);
    dispatch(
        ctx,
        "identity_perm",
        IDENTITY_SHADER,
        "identity_perm",
        &[perm, BufRegion::whole(&params_buffer)],
        n,
    );
}

/// Gather row indices and word-wise values through a permutation.
pub fn launch_permute_gather(
    ctx: &SparseContext,
    perm: BufRegion,
    rows_in: BufRegion,
    vals_in: BufRegion,
    rows_out: BufRegion,
    vals_out: BufRegion,
    nnz: u64,
    words_per_elem: u32,
) {
    let params = GatherParams {
        nnz: nnz as u32,
        words_per_elem,
        _pad0: 0,
        _pad1: 0,
    };
    let params_buffer = ctx.create_params_buffer("permute_gather_params", &params);
    dispatch(
        ctx,
        "permute_gather",
        GATHER_SHADER,
        "permute_gather",
        &[
            perm,
            rows_in,
            vals_in,
            rows_out,
            vals_out,
            BufRegion::whole(&params_buffer),
        ],
        nnz,
    );
}

/// Fill `len` words of `out` with a constant.
pub fn launch_fill_value(ctx: &SparseContext, out: BufRegion, len: u64, value: u32) {
    let params = FillParams {
        len: len as u32,
        value,
        _pad0: 0,
        _pad1: 0,
    };
    let params_buffer = ctx.create_params_buffer("fill_value_params", &params);
    dispatch(
        ctx,
        "fill_value",
        FILL_SHADER,
        "fill_value",
        &[out, BufRegion::whole(&params_buffer)],
        len,
    );
}
