//! Sparse format conversions.
//!
//! The CSR → CSC transpose follows a two-call protocol:
//! [`csr2csc_buffer_size`] reports the scratch bytes a conversion with the
//! given shape will need, then [`csr2csc`] runs the conversion against a
//! scratch buffer of at least that size. The size query is pure host math and
//! touches no device state, so it can run before any allocation.
//!
//! `csr2csc` validates everything up front and enqueues kernels only if the
//! whole call can succeed. It returns as soon as the work is submitted; call
//! [`SparseContext::synchronize`] before reading the outputs or reusing the
//! scratch buffer.

mod kernels;
mod shaders;
mod transpose;

use wgpu::Buffer;

use crate::context::SparseContext;
use crate::dtype::{DType, IndexType};
use crate::error::{Error, Result};
use crate::layout::ScratchLayout;
use crate::pipeline::{BufRegion, MAX_DISPATCH_LANES};

/// What the transpose produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Transpose structure and values
    Numeric,
    /// Transpose structure only; value buffers are ignored
    Symbolic,
}

/// Index base of the offset and index arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexBase {
    /// C-style zero-based indexing
    #[default]
    Zero,
    /// Fortran-style one-based indexing
    One,
}

impl IndexBase {
    /// The base as an integer offset.
    pub const fn offset(&self) -> u32 {
        match self {
            IndexBase::Zero => 0,
            IndexBase::One => 1,
        }
    }
}

/// Device buffers of the CSR input.
///
/// Which fields must be present depends on the matrix shape and the action;
/// a buffer that the size/mode combination requires but that is `None` fails
/// validation with [`Error::InvalidPointer`]. All buffers need
/// `STORAGE | COPY_DST | COPY_SRC` usage
/// ([`SparseContext::create_storage_buffer`] provides it): the engine moves
/// index data with buffer-to-buffer copies in both directions.
#[derive(Clone, Copy, Default)]
pub struct CsrInput<'a> {
    /// `m + 1` row offsets
    pub row_offsets: Option<&'a Buffer>,
    /// `nnz` column indices
    pub col_indices: Option<&'a Buffer>,
    /// `nnz` values; ignored in symbolic mode
    pub values: Option<&'a Buffer>,
}

/// Device buffers of the CSC output.
#[derive(Clone, Copy, Default)]
pub struct CscOutput<'a> {
    /// `n + 1` column offsets
    pub col_offsets: Option<&'a Buffer>,
    /// `nnz` row indices
    pub row_indices: Option<&'a Buffer>,
    /// `nnz` values; ignored in symbolic mode
    pub values: Option<&'a Buffer>,
}

/// Scratch bytes needed by [`csr2csc`] for an `m x n` CSR matrix with `nnz`
/// nonzeros.
///
/// Degenerate shapes (`m`, `n`, or `nnz` zero) need no scratch and report 0.
/// The result depends only on `nnz` and the index widths; neither the action
/// nor the matrix contents change it.
///
/// # Errors
///
/// Returns [`Error::InvalidSize`] for negative dimensions and
/// [`Error::InvalidPointer`] if a buffer the shape requires is missing:
/// row offsets whenever `m > 0`, column indices whenever `nnz > 0`. The
/// pointer checks apply before the degenerate fast path, so an empty matrix
/// with positive `m` still needs its row offsets.
pub fn csr2csc_buffer_size(
    m: i64,
    n: i64,
    nnz: i64,
    csr_row_offsets: Option<&Buffer>,
    csr_col_indices: Option<&Buffer>,
    action: Action,
    index_type: IndexType,
    col_index_type: IndexType,
) -> Result<u64> {
    log::trace!(
        "csr2csc_buffer_size m={m} n={n} nnz={nnz} action={action:?} \
         index_type={index_type:?} col_index_type={col_index_type:?}"
    );

    check_size(m, "m")?;
    check_size(n, "n")?;
    check_size(nnz, "nnz")?;

    if m > 0 && csr_row_offsets.is_none() {
        return Err(Error::InvalidPointer {
            name: "csr_row_offsets",
        });
    }
    if nnz > 0 && csr_col_indices.is_none() {
        return Err(Error::InvalidPointer {
            name: "csr_col_indices",
        });
    }

    if m == 0 || n == 0 || nnz == 0 {
        return Ok(0);
    }

    Ok(ScratchLayout::for_transpose(nnz as u64, index_type, col_index_type).total_bytes)
}

/// Convert an `m x n` CSR matrix with `nnz` nonzeros into CSC form.
///
/// Equivalent to materializing the transpose: the output is a valid CSC
/// matrix whose row indices within each column appear in ascending order of
/// their source position, so the conversion is reproducible and, run twice,
/// round-trips exactly. In symbolic mode only the structure arrays are
/// written and all value buffers are ignored.
///
/// `scratch` must hold at least the bytes [`csr2csc_buffer_size`] reports for
/// the same arguments, with `STORAGE | COPY_DST | COPY_SRC` usage (symbolic
/// mode may copy the sorted row indices out of it). Degenerate shapes
/// (`m == 0`, `n == 0`) succeed without touching it; `nnz == 0` only writes
/// the column offsets.
///
/// # Errors
///
/// Fails without enqueueing any work if a dimension is negative
/// ([`Error::InvalidSize`]), a required buffer is missing
/// ([`Error::InvalidPointer`]), the scratch is undersized
/// ([`Error::ScratchTooSmall`]), the value or index type has no kernel
/// ([`Error::UnsupportedDType`], [`Error::NotImplemented`]), or the shape
/// exceeds the dispatch limits ([`Error::BackendLimitation`]).
#[allow(clippy::too_many_arguments)]
pub fn csr2csc(
    ctx: &SparseContext,
    m: i64,
    n: i64,
    nnz: i64,
    csr: CsrInput<'_>,
    csc: CscOutput<'_>,
    value_type: DType,
    action: Action,
    base: IndexBase,
    index_type: IndexType,
    col_index_type: IndexType,
    scratch: Option<&Buffer>,
) -> Result<()> {
    log::trace!(
        "csr2csc m={m} n={n} nnz={nnz} value_type={value_type:?} action={action:?} \
         base={base:?} index_type={index_type:?} col_index_type={col_index_type:?}"
    );

    validate(m, n, nnz, action, &BufferPresence::of(&csr, &csc))?;

    // Nothing to do for an empty shape, whatever the other arguments say.
    if m == 0 || n == 0 {
        return Ok(());
    }

    if n + 1 > MAX_DISPATCH_LANES as i64 || m > MAX_DISPATCH_LANES as i64 {
        return Err(Error::backend_limitation(
            "csr2csc",
            format!("matrix dimensions {m} x {n} exceed the dispatch limit"),
        ));
    }

    if nnz == 0 {
        // Structure of the transpose is n+1 offsets, all equal to the base.
        let col_offsets = required(csc.col_offsets, "csc_col_offsets")?;
        kernels::launch_fill_value(
            ctx,
            BufRegion::whole(col_offsets),
            (n + 1) as u64,
            base.offset(),
        );
        return Ok(());
    }

    index_type.require_device_support()?;
    col_index_type.require_device_support()?;
    if action == Action::Numeric {
        // Fail before enqueueing anything, not inside the pipeline.
        value_type.words_per_element("csr2csc")?;
    }

    if nnz > MAX_DISPATCH_LANES as i64 {
        return Err(Error::backend_limitation(
            "csr2csc",
            format!("{nnz} nonzeros exceed the dispatch limit"),
        ));
    }

    let scratch = required(scratch, "scratch")?;
    let layout = ScratchLayout::for_transpose(nnz as u64, index_type, col_index_type);
    if scratch.size() < layout.total_bytes {
        return Err(Error::ScratchTooSmall {
            required: layout.total_bytes,
            provided: scratch.size(),
        });
    }

    let args = transpose::TransposeArgs {
        m: m as u64,
        n: n as u64,
        nnz: nnz as u64,
        csr_row_offsets: required(csr.row_offsets, "csr_row_offsets")?,
        csr_col_indices: required(csr.col_indices, "csr_col_indices")?,
        csr_values: csr.values,
        csc_col_offsets: required(csc.col_offsets, "csc_col_offsets")?,
        csc_row_indices: required(csc.row_indices, "csc_row_indices")?,
        csc_values: csc.values,
        value_type,
        action,
        base,
        scratch,
    };
    transpose::transpose_core(ctx, &args, &layout)
}

fn check_size(value: i64, name: &'static str) -> Result<()> {
    if value < 0 {
        return Err(Error::InvalidSize { name, value });
    }
    Ok(())
}

fn required<'a>(buffer: Option<&'a Buffer>, name: &'static str) -> Result<&'a Buffer> {
    buffer.ok_or(Error::InvalidPointer { name })
}

/// Which buffers the caller supplied. Split from the buffer handles so the
/// size/mode validation matrix is testable without a device.
#[derive(Debug, Clone, Copy)]
struct BufferPresence {
    csr_row_offsets: bool,
    csr_col_indices: bool,
    csr_values: bool,
    csc_col_offsets: bool,
    csc_row_indices: bool,
    csc_values: bool,
}

impl BufferPresence {
    fn of(csr: &CsrInput<'_>, csc: &CscOutput<'_>) -> Self {
        Self {
            csr_row_offsets: csr.row_offsets.is_some(),
            csr_col_indices: csr.col_indices.is_some(),
            csr_values: csr.values.is_some(),
            csc_col_offsets: csc.col_offsets.is_some(),
            csc_row_indices: csc.row_indices.is_some(),
            csc_values: csc.values.is_some(),
        }
    }
}

/// The size/mode validation matrix. Every requirement is conditional on the
/// sizes: a buffer only has to exist if the shape makes it non-empty, and the
/// value arrays only in numeric mode.
fn validate(m: i64, n: i64, nnz: i64, action: Action, have: &BufferPresence) -> Result<()> {
    check_size(m, "m")?;
    check_size(n, "n")?;
    check_size(nnz, "nnz")?;

    if m > 0 && !have.csr_row_offsets {
        return Err(Error::InvalidPointer {
            name: "csr_row_offsets",
        });
    }
    if n > 0 && !have.csc_col_offsets {
        return Err(Error::InvalidPointer {
            name: "csc_col_offsets",
        });
    }

    match action {
        Action::Numeric => {
            // Values and indices travel together: supplying one half of
            // either pair is always a caller error, even at nnz == 0.
            if have.csr_values != have.csr_col_indices {
                return Err(Error::InvalidPointer {
                    name: if have.csr_values {
                        "csr_col_indices"
                    } else {
                        "csr_values"
                    },
                });
            }
            if have.csc_values != have.csc_row_indices {
                return Err(Error::InvalidPointer {
                    name: if have.csc_values {
                        "csc_row_indices"
                    } else {
                        "csc_values"
                    },
                });
            }
            if nnz != 0 && !have.csr_values {
                return Err(Error::InvalidPointer { name: "csr_values" });
            }
            if nnz != 0 && !have.csc_row_indices {
                return Err(Error::InvalidPointer {
                    name: "csc_row_indices",
                });
            }
        }
        Action::Symbolic => {
            if nnz != 0 && !have.csr_col_indices {
                return Err(Error::InvalidPointer {
                    name: "csr_col_indices",
                });
            }
            if nnz != 0 && !have.csc_row_indices {
                return Err(Error::InvalidPointer {
                    name: "csc_row_indices",
                });
            }
        }
    }

    Ok(())
}
