//! Error types for sparsefmt

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using sparsefmt's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sparsefmt operations.
///
/// All validation happens before any work is enqueued; once a call returns
/// `Ok`, the conversion is fully submitted to the queue and no further error
/// is reported through this type. Device-side faults surface through wgpu's
/// own error reporting.
#[derive(Error, Debug)]
pub enum Error {
    /// A dimension or count argument is negative
    #[error("Invalid size: argument '{name}' is {value}, must be >= 0")]
    InvalidSize {
        /// The argument name
        name: &'static str,
        /// The offending value
        value: i64,
    },

    /// A buffer required by the current size/mode combination was not supplied
    #[error("Invalid pointer: required buffer '{name}' is missing")]
    InvalidPointer {
        /// The buffer name
        name: &'static str,
    },

    /// The scratch buffer is smaller than the size query reported
    #[error("Scratch buffer too small: need {required} bytes, got {provided}")]
    ScratchTooSmall {
        /// Bytes required for these arguments
        required: u64,
        /// Bytes in the supplied buffer
        provided: u64,
    },

    /// Value dtype with no kernel implementation
    #[error("Unsupported dtype {dtype:?} for operation '{op}'")]
    UnsupportedDType {
        /// The unsupported dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
    },

    /// Requested type/width variant has no implementation
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },

    /// Input is valid but exceeds what the backend can dispatch
    #[error("WebGPU limitation: {op} - {reason}")]
    BackendLimitation {
        /// The operation being attempted
        op: &'static str,
        /// Description of the limitation
        reason: String,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create an unsupported dtype error
    pub fn unsupported_dtype(dtype: DType, op: &'static str) -> Self {
        Self::UnsupportedDType { dtype, op }
    }

    /// Create a backend limitation error
    pub fn backend_limitation(op: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendLimitation {
            op,
            reason: reason.into(),
        }
    }
}
