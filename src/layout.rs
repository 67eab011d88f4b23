//! Scratch buffer layout for the CSR → CSC transpose.
//!
//! The original fixed-function APIs of this shape compute the scratch size in
//! one place and re-derive the same byte offsets with pointer arithmetic in
//! another; any drift between the two is silent corruption. Here a single
//! [`ScratchLayout`] is computed once and consumed by both the size query and
//! the executor, so the two cannot disagree.
//!
//! All regions start on a 256-byte boundary. 256 is both an
//! accelerator-friendly transaction size and WebGPU's default
//! `min_storage_buffer_offset_alignment`, so every region can bind directly
//! as a storage-buffer sub-range.

use crate::dtype::IndexType;
use crate::sort;

/// Region alignment in bytes.
pub const SCRATCH_ALIGN: u64 = 256;

/// Round `bytes` up to the next region boundary.
#[inline]
pub const fn align_up(bytes: u64) -> u64 {
    bytes.div_ceil(SCRATCH_ALIGN) * SCRATCH_ALIGN
}

/// One carved sub-region of the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Byte offset from the start of the scratch buffer
    pub offset: u64,
    /// Region length in bytes
    pub size: u64,
}

/// Region table for one transpose call.
///
/// Identical for symbolic and numeric modes: both need a key copy, a
/// ping-pong side buffer, a permutation/row-index slot, and the sort
/// primitive's own scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchLayout {
    /// Copy of the source column indices, used as sort keys
    pub keys: Region,
    /// Secondary key/value ping-pong buffer
    pub work2: Region,
    /// Permutation (numeric) or spare row-index (symbolic) buffer
    pub perm: Region,
    /// Scratch consumed by the sort primitive itself
    pub sort: Region,
    /// Total bytes the caller must allocate
    pub total_bytes: u64,
}

impl ScratchLayout {
    /// Compute the region table for `nnz` nonzeros and the given index widths.
    ///
    /// Callers handle the degenerate `nnz == 0` case before reaching here;
    /// the layout of an empty matrix is meaningless and never consulted.
    pub fn for_transpose(nnz: u64, index_type: IndexType, col_index_type: IndexType) -> Self {
        debug_assert!(nnz > 0);

        let j = col_index_type.size_bytes();
        let wide = index_type.size_bytes().max(j);

        let keys_size = align_up(j * nnz);
        let work_size = align_up(wide * nnz);
        let sort_size = align_up(sort::radix_sort_pairs_buffer_size(nnz));

        let keys = Region {
            offset: 0,
            size: keys_size,
        };
        let work2 = Region {
            offset: keys.offset + keys.size,
            size: work_size,
        };
        let perm = Region {
            offset: work2.offset + work2.size,
            size: work_size,
        };
        let sort = Region {
            offset: perm.offset + perm.size,
            size: sort_size,
        };

        Self {
            keys,
            work2,
            perm,
            sort,
            total_bytes: sort.offset + sort.size,
        }
    }
}
