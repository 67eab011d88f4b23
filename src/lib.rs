//! # sparsefmt
//!
//! GPU sparse-matrix format conversion on WebGPU, built around a CSR → CSC
//! transpose engine.
//!
//! The conversion follows the two-call protocol of fixed-function sparse
//! libraries: query the scratch requirement with
//! [`convert::csr2csc_buffer_size`], allocate once, then run
//! [`convert::csr2csc`] as often as the shape allows. Output is
//! deterministic: within each column, row indices appear in ascending order
//! of their source position, and repeated runs produce identical bytes.
//!
//! ```no_run
//! use sparsefmt::{
//!     convert::{self, Action, CsrInput, CscOutput, IndexBase},
//!     DType, IndexType, SparseContext,
//! };
//!
//! # fn main() -> sparsefmt::Result<()> {
//! let ctx = SparseContext::from_default_adapter()?;
//!
//! // A 2 x 3 CSR matrix with 3 nonzeros, already uploaded.
//! let (m, n, nnz) = (2i64, 3i64, 3i64);
//! let row_offsets = ctx.create_storage_buffer("row_offsets", 4 * (m as u64 + 1));
//! let col_indices = ctx.create_storage_buffer("col_indices", 4 * nnz as u64);
//! let values = ctx.create_storage_buffer("values", 4 * nnz as u64);
//! ctx.write_buffer(&row_offsets, &[0u32, 2, 3]);
//! ctx.write_buffer(&col_indices, &[2u32, 0, 1]);
//! ctx.write_buffer(&values, &[5.0f32, 7.0, 9.0]);
//!
//! let col_offsets = ctx.create_storage_buffer("col_offsets", 4 * (n as u64 + 1));
//! let row_indices = ctx.create_storage_buffer("row_indices", 4 * nnz as u64);
//! let out_values = ctx.create_storage_buffer("out_values", 4 * nnz as u64);
//!
//! let bytes = convert::csr2csc_buffer_size(
//!     m, n, nnz,
//!     Some(&row_offsets), Some(&col_indices),
//!     Action::Numeric, IndexType::I32, IndexType::I32,
//! )?;
//! let scratch = ctx.create_storage_buffer("scratch", bytes);
//!
//! convert::csr2csc(
//!     &ctx, m, n, nnz,
//!     CsrInput {
//!         row_offsets: Some(&row_offsets),
//!         col_indices: Some(&col_indices),
//!         values: Some(&values),
//!     },
//!     CscOutput {
//!         col_offsets: Some(&col_offsets),
//!         row_indices: Some(&row_indices),
//!         values: Some(&out_values),
//!     },
//!     DType::F32, Action::Numeric, IndexBase::Zero,
//!     IndexType::I32, IndexType::I32,
//!     Some(&scratch),
//! )?;
//! ctx.synchronize()?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod convert;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod sort;

pub use context::SparseContext;
pub use dtype::{DType, IndexType};
pub use error::{Error, Result};
