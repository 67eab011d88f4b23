//! Stable key/value sort primitive for 32-bit integer keys.
//!
//! Query-then-execute, like the transpose engine built on top of it:
//! [`radix_sort_pairs_buffer_size`] reports the scratch bytes a sort of `n`
//! pairs will need, [`radix_sort_pairs`] consumes a scratch region of at
//! least that size. The sort is an LSD binary split over an explicit bit
//! range, one bit per pass, and is stable: equal keys keep their relative
//! order, which the transpose relies on for reproducible output.
//!
//! The sort does not run in place. Keys and values each ping-pong between two
//! caller-provided regions; after the run the result sits in whichever side
//! [`DoubleBuffer::current`] names. The selector is an explicit tag so
//! callers branch on it rather than comparing buffer identities.

mod shaders;

use crate::context::SparseContext;
use crate::error::{Error, Result};
use crate::layout::align_up;
use crate::pipeline::{BufRegion, LayoutKey};

pub use shaders::SORT_BLOCK_SIZE;
use shaders::RADIX_SORT_SHADER;

/// Which side of a [`DoubleBuffer`] currently holds live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSel {
    /// The first region passed to [`DoubleBuffer::new`]
    A,
    /// The second region passed to [`DoubleBuffer::new`]
    B,
}

/// A ping-pong pair of buffer regions with a tagged current side.
#[derive(Clone, Copy)]
pub struct DoubleBuffer<'a> {
    a: BufRegion<'a>,
    b: BufRegion<'a>,
    current: BufferSel,
}

impl<'a> DoubleBuffer<'a> {
    /// Create a pair with side A current.
    pub fn new(a: BufRegion<'a>, b: BufRegion<'a>) -> Self {
        Self {
            a,
            b,
            current: BufferSel::A,
        }
    }

    /// The region holding live data.
    pub fn current(&self) -> BufRegion<'a> {
        match self.current {
            BufferSel::A => self.a,
            BufferSel::B => self.b,
        }
    }

    /// The other region.
    pub fn alternate(&self) -> BufRegion<'a> {
        match self.current {
            BufferSel::A => self.b,
            BufferSel::B => self.a,
        }
    }

    /// Which side is current.
    pub fn selector(&self) -> BufferSel {
        self.current
    }

    fn swap(&mut self) {
        self.current = match self.current {
            BufferSel::A => BufferSel::B,
            BufferSel::B => BufferSel::A,
        };
    }
}

/// Scratch bytes needed to sort `n` key/value pairs.
///
/// Pure in everything but `n`; the transpose size estimator calls this
/// instead of assuming a layout.
pub fn radix_sort_pairs_buffer_size(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let num_blocks = n.div_ceil(SORT_BLOCK_SIZE as u64);
    // Per-block zero counters plus one aligned slot for the grand total.
    align_up(4 * num_blocks) + align_up(4)
}

/// Stable ascending sort of (key, value) pairs on bits `[start_bit, end_bit)`.
///
/// Enqueues `end_bit - start_bit` passes on the context queue and returns
/// without waiting. Each pass flips both double buffers, so on return
/// `keys.current()` and `values.current()` name the sorted result.
///
/// # Errors
///
/// Fails before enqueueing anything if the scratch region is smaller than
/// [`radix_sort_pairs_buffer_size`] reports, the bit range is inverted, or
/// `n` exceeds the dispatch limit.
pub fn radix_sort_pairs(
    ctx: &SparseContext,
    keys: &mut DoubleBuffer,
    values: &mut DoubleBuffer,
    n: u64,
    start_bit: u32,
    end_bit: u32,
    scratch: BufRegion,
) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    if start_bit > end_bit || end_bit > 32 {
        return Err(Error::backend_limitation(
            "radix_sort_pairs",
            format!("invalid bit range [{start_bit}, {end_bit})"),
        ));
    }

    let required = radix_sort_pairs_buffer_size(n);
    if scratch.size < required {
        return Err(Error::ScratchTooSmall {
            required,
            provided: scratch.size,
        });
    }

    let num_blocks = n.div_ceil(SORT_BLOCK_SIZE as u64);
    if num_blocks > 65_535 {
        return Err(Error::backend_limitation(
            "radix_sort_pairs",
            format!("{n} pairs exceed the one-dimensional dispatch limit"),
        ));
    }

    // Carve the scratch region: block counters first, totals slot after.
    let counts_size = align_up(4 * num_blocks);
    let counts = BufRegion::slice(scratch.buffer, scratch.offset, counts_size);
    let totals = BufRegion::slice(scratch.buffer, scratch.offset + counts_size, align_up(4));

    for bit in start_bit..end_bit {
        enqueue_pass(ctx, keys, values, counts, totals, n, bit, num_blocks as u32);
        keys.swap();
        values.swap();
    }

    Ok(())
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SortPassParams {
    n: u32,
    bit: u32,
    num_blocks: u32,
    _pad0: u32,
}

fn enqueue_pass(
    ctx: &SparseContext,
    keys: &DoubleBuffer,
    values: &DoubleBuffer,
    counts: BufRegion,
    totals: BufRegion,
    n: u64,
    bit: u32,
    num_blocks: u32,
) {
    let cache = ctx.pipeline_cache();
    let module = cache.get_or_create_module("radix_sort_pairs", RADIX_SORT_SHADER);
    let layout = cache.get_or_create_layout(LayoutKey {
        num_storage_buffers: 6,
        num_uniform_buffers: 1,
    });

    let count_pipeline =
        cache.get_or_create_pipeline("radix_sort_pairs", "radix_count", &module, &layout);
    let scan_pipeline =
        cache.get_or_create_pipeline("radix_sort_pairs", "radix_block_scan", &module, &layout);
    let scatter_pipeline =
        cache.get_or_create_pipeline("radix_sort_pairs", "radix_scatter", &module, &layout);

    let params = SortPassParams {
        n: n as u32,
        bit,
        num_blocks,
        _pad0: 0,
    };
    let params_buffer = ctx.create_params_buffer("radix_sort_pass_params", &params);

    let bind_group = cache.create_bind_group(
        &layout,
        &[
            keys.current(),
            values.current(),
            keys.alternate(),
            values.alternate(),
            counts,
            totals,
            BufRegion::whole(&params_buffer),
        ],
    );

    let mut encoder = cache
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("radix_sort_pass"),
        });

    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("radix_count"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&count_pipeline);
        pass.set_bind_group(0, Some(&bind_group), &[]);
        pass.dispatch_workgroups(num_blocks, 1, 1);
    }
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("radix_block_scan"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&scan_pipeline);
        pass.set_bind_group(0, Some(&bind_group), &[]);
        pass.dispatch_workgroups(1, 1, 1);
    }
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("radix_scatter"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&scatter_pipeline);
        pass.set_bind_group(0, Some(&bind_group), &[]);
        pass.dispatch_workgroups(num_blocks, 1, 1);
    }

    ctx.queue().submit(std::iter::once(encoder.finish()));
}

/// Smallest bit count covering keys up to and including `max_key`.
pub fn bits_for(max_key: u32) -> u32 {
    32 - max_key.leading_zeros()
}
