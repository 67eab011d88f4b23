//! Value and index type descriptors.
//!
//! The conversion engine never performs arithmetic on values; it only moves
//! them. Value types are therefore described by their width alone, and wide
//! types (f64, complex) are handled on WebGPU as multiples of 32-bit words.

use crate::error::{Error, Result};

/// Element type of the value array of a sparse matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Complex of two 32-bit floats
    C32,
    /// Complex of two 64-bit floats
    C64,
    /// 32-bit signed integer
    I32,
    /// 8-bit signed integer
    I8,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn size_bytes(&self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::C32 => 8,
            DType::C64 => 16,
            DType::I8 => 1,
        }
    }

    /// Number of 32-bit words per element, for word-wise gather kernels.
    ///
    /// Sub-word types cannot be addressed from WGSL and are rejected.
    pub fn words_per_element(&self, op: &'static str) -> Result<u32> {
        match self.size_bytes() {
            1 => Err(Error::unsupported_dtype(*self, op)),
            bytes => Ok((bytes / 4) as u32),
        }
    }
}

/// Width of the offset/index integers of a sparse matrix.
///
/// The scratch-layout math supports both widths; the WebGPU executor only
/// implements `I32` (WGSL has no 64-bit integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 32-bit signed indices
    I32,
    /// 64-bit signed indices
    I64,
}

impl IndexType {
    /// Size of one index in bytes.
    pub const fn size_bytes(&self) -> u64 {
        match self {
            IndexType::I32 => 4,
            IndexType::I64 => 8,
        }
    }

    /// Reject widths the WebGPU kernels cannot express.
    pub(crate) fn require_device_support(&self) -> Result<()> {
        match self {
            IndexType::I32 => Ok(()),
            IndexType::I64 => Err(Error::NotImplemented {
                feature: "64-bit indices on the WebGPU backend",
            }),
        }
    }
}
