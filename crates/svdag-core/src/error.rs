//! Error types shared across the pipeline.

use thiserror::Error;

/// Crate-wide error type.
///
/// Per the pipeline's error handling design, only genuine failures live
/// here. Out-of-bounds queries are ordinary return values (`-1`/`None`), not
/// errors.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while loading or saving an encoded stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stage was invoked on a structure in the wrong lifecycle state,
    /// e.g. `to_dag` on something that is already a DAG.
    #[error("wrong state transform: {0}")]
    WrongStateTransform(String),

    /// A child pointer in a decoded stream referenced an offset outside the
    /// stream (only raised when integrity checking is enabled).
    #[error("corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// Any other invalid data condition.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
