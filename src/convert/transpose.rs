//! CSR → CSC transpose execution.
//!
//! Both modes share the same skeleton: copy the column indices into scratch
//! as sort keys, expand the row offsets into explicit row indices, stable-sort
//! by column key, then collapse the sorted keys into CSC column offsets. The
//! modes differ in what rides along as the sort value:
//!
//! * symbolic: the expanded row indices ride directly, so the sorted result
//!   IS the CSC row-index array;
//! * numeric: an identity permutation rides, and a final gather applies it to
//!   row indices and values in one pass. Values are never sort payload, so
//!   their width never touches the sort.
//!
//! All passes are enqueued in order on the context queue; the caller
//! synchronizes.

use wgpu::Buffer;

use crate::context::SparseContext;
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::layout::ScratchLayout;
use crate::pipeline::BufRegion;
use crate::sort::{self, BufferSel, DoubleBuffer};

use super::kernels;
use super::{Action, IndexBase};

/// Fully validated transpose arguments. `values` pairs are `Some` exactly
/// when `action` is numeric.
pub(super) struct TransposeArgs<'a> {
    pub m: u64,
    pub n: u64,
    pub nnz: u64,
    pub csr_row_offsets: &'a Buffer,
    pub csr_col_indices: &'a Buffer,
    pub csr_values: Option<&'a Buffer>,
    pub csc_col_offsets: &'a Buffer,
    pub csc_row_indices: &'a Buffer,
    pub csc_values: Option<&'a Buffer>,
    pub value_type: DType,
    pub action: Action,
    pub base: IndexBase,
    pub scratch: &'a Buffer,
}

pub(super) fn transpose_core(
    ctx: &SparseContext,
    args: &TransposeArgs<'_>,
    layout: &ScratchLayout,
) -> Result<()> {
    let base = args.base.offset();
    let keys = BufRegion::slice(args.scratch, layout.keys.offset, layout.keys.size);
    let work2 = BufRegion::slice(args.scratch, layout.work2.offset, layout.work2.size);
    let perm = BufRegion::slice(args.scratch, layout.perm.offset, layout.perm.size);
    let sort_scratch = BufRegion::slice(args.scratch, layout.sort.offset, layout.sort.size);

    // Keys carry the caller's index base; the largest possible key is
    // (n - 1) + base, and sorting only its significant bits suffices.
    let end_bit = sort::bits_for((args.n - 1) as u32 + base);

    // Column indices double as sort keys; sort in a scratch copy so the
    // caller's CSR input survives.
    copy_words(ctx, args.csr_col_indices, 0, args.scratch, layout.keys.offset, args.nnz);

    match args.action {
        Action::Symbolic => {
            kernels::launch_expand_offsets(
                ctx,
                BufRegion::whole(args.csr_row_offsets),
                BufRegion::whole(args.csc_row_indices),
                args.m,
                base,
            );

            let mut key_pair = DoubleBuffer::new(keys, perm);
            let mut val_pair =
                DoubleBuffer::new(BufRegion::whole(args.csc_row_indices), work2);
            sort::radix_sort_pairs(
                ctx,
                &mut key_pair,
                &mut val_pair,
                args.nnz,
                0,
                end_bit,
                sort_scratch,
            )?;

            kernels::launch_collapse_keys(
                ctx,
                key_pair.current(),
                BufRegion::whole(args.csc_col_offsets),
                args.n,
                args.nnz,
                base,
            );

            // The sorted row indices landed wherever the pass count left
            // them; move them home if that is the scratch side.
            if val_pair.selector() == BufferSel::B {
                copy_words(ctx, args.scratch, layout.work2.offset, args.csc_row_indices, 0, args.nnz);
            }
        }
        Action::Numeric => {
            // Validation guarantees the value buffers for numeric mode.
            let (csr_values, csc_values) = match (args.csr_values, args.csc_values) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(Error::InvalidPointer { name: "csr_values" }),
            };
            let words_per_elem = args.value_type.words_per_element("csr2csc")?;

            kernels::launch_identity_perm(ctx, perm, args.nnz);

            let mut key_pair =
                DoubleBuffer::new(keys, BufRegion::whole(args.csc_row_indices));
            let mut val_pair = DoubleBuffer::new(perm, work2);
            sort::radix_sort_pairs(
                ctx,
                &mut key_pair,
                &mut val_pair,
                args.nnz,
                0,
                end_bit,
                sort_scratch,
            )?;

            kernels::launch_collapse_keys(
                ctx,
                key_pair.current(),
                BufRegion::whole(args.csc_col_offsets),
                args.n,
                args.nnz,
                base,
            );

            // The key region is dead after the collapse; reuse it as staging
            // for the expanded row indices the gather reads from.
            kernels::launch_expand_offsets(
                ctx,
                BufRegion::whole(args.csr_row_offsets),
                keys,
                args.m,
                base,
            );

            kernels::launch_permute_gather(
                ctx,
                val_pair.current(),
                keys,
                BufRegion::whole(csr_values),
                BufRegion::whole(args.csc_row_indices),
                BufRegion::whole(csc_values),
                args.nnz,
                words_per_elem,
            );
        }
    }

    Ok(())
}

/// Enqueue a device copy of `count` 32-bit words.
fn copy_words(
    ctx: &SparseContext,
    src: &Buffer,
    src_offset: u64,
    dst: &Buffer,
    dst_offset: u64,
    count: u64,
) {
    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("transpose_copy"),
        });
    encoder.copy_buffer_to_buffer(src, src_offset, dst, dst_offset, 4 * count);
    ctx.queue().submit(std::iter::once(encoder.finish()));
}
