//! Error types for IronMover driver operations.

use thiserror::Error;

/// Driver error type shared by all IronMover crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The data mover has not been bound to a hardware block yet.
    #[error("data mover is not initialised")]
    NotInitialised,

    /// A single register or DMA operation failed.
    #[error("device i/o failed: {context}")]
    IoFailed {
        /// Description of the failed operation.
        context: String,
    },

    /// A caller supplied an out-of-range or inconsistent argument.
    #[error("invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the violated precondition.
        message: String,
    },

    /// The named compute unit does not exist on the device.
    #[error("compute unit not found: {name}")]
    CuNameNotFound {
        /// The compute unit name that was looked up.
        name: String,
    },

    /// Buffer object allocation failed.
    #[error("failed to allocate buffer object ({size_bytes} bytes)")]
    BufferAllocationFailed {
        /// Requested allocation size in bytes.
        size_bytes: usize,
    },

    /// Mapping a buffer object into process address space failed.
    #[error("failed to map buffer object into process address space")]
    BufferMapFailed,

    /// A directional buffer synchronization failed.
    #[error("failed to sync buffer object: {context}")]
    BufferSyncFailed {
        /// Description of the failed sync.
        context: String,
    },
}

/// Result type alias for IronMover driver operations.
pub type Result<T> = std::result::Result<T, Error>;
