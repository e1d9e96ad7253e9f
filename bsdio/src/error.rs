// SPDX-License-Identifier: MIT

use core::fmt;
use std::io;

/// Result type for BlockIO operations.
pub type BlockIOResult<T = ()> = Result<T, BlockIOError>;

/// Error type for BlockIO operations.
#[derive(Debug)]
pub enum BlockIOError {
    /// Underlying device I/O error (seek failure, short read/write, ...).
    Io(io::Error),

    /// Attempted to read or write out of bounds.
    OutOfBounds,

    /// Unsupported operation for this backend.
    Unsupported,

    /// Anything else.
    Other(&'static str),
}

impl From<io::Error> for BlockIOError {
    #[inline]
    fn from(e: io::Error) -> Self {
        BlockIOError::Io(e)
    }
}

impl fmt::Display for BlockIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockIOError::Io(e) => write!(f, "{e}"),
            BlockIOError::OutOfBounds => write!(f, "Out of bounds"),
            BlockIOError::Unsupported => write!(f, "Unsupported operation"),
            BlockIOError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for BlockIOError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockIOError::Io(e) => Some(e),
            _ => None,
        }
    }
}
