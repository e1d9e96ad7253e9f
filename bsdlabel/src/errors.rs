// SPDX-License-Identifier: MIT

use core::fmt;

use bsdio::error::BlockIOError;

/// Unified error type for disklabel operations.
#[derive(Debug)]
pub enum LabelError {
    /// Device I/O failed (seek, short read/write).
    Io(BlockIOError),
    /// Bad index, bad type, slot limit exceeded at an API boundary.
    Invalid(&'static str),
    /// No disklabel magic, or no BSD-family MBR child.
    NotFound,
    /// The user cancelled a prompt; no state was changed.
    Cancelled,
    /// A bootstrap stage intrudes into the embedded disklabel region.
    Overlap,
    /// On-disk or in-memory label is inconsistent.
    Corrupt(&'static str),
}

impl From<BlockIOError> for LabelError {
    fn from(e: BlockIOError) -> Self {
        LabelError::Io(e)
    }
}

impl From<std::io::Error> for LabelError {
    fn from(e: std::io::Error) -> Self {
        LabelError::Io(BlockIOError::Io(e))
    }
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::Io(e) => write!(f, "{e}"),
            LabelError::Invalid(msg) => write!(f, "{msg}"),
            LabelError::NotFound => write!(f, "No BSD disklabel found"),
            LabelError::Cancelled => write!(f, "Cancelled by user"),
            LabelError::Overlap => write!(f, "Bootstrap overlaps with disklabel"),
            LabelError::Corrupt(msg) => write!(f, "Corrupt disklabel: {msg}"),
        }
    }
}

impl std::error::Error for LabelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LabelError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type LabelResult<T = ()> = Result<T, LabelError>;
