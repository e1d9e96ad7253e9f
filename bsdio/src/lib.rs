// SPDX-License-Identifier: MIT

// === Core modules ===
pub mod error;

// === Backend modules ===
mod mem;
mod std_io;

// === Prelude re-exports (central entrypoint) ===
pub mod prelude {
    pub use super::error::*;
    pub use super::BlockIO;
    pub use super::BlockIOSetLen;
    pub use super::BlockIOStructExt;

    pub use super::mem::MemBlockIO;
    pub use super::std_io::StdBlockIO;
}

use error::*;

/// Maximum size of the internal scratch buffer for struct reads.
const BLOCK_BUF_SIZE: usize = 8192;

/// Block IO abstraction trait.
///
/// Allows read/write/flush at arbitrary byte offsets.
/// Implementations may target RAM, files, block devices, etc.
pub trait BlockIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> BlockIOResult;
}

/// Trait for setting the length of a BlockIO object.
///
/// Allows resizing the underlying storage (if supported by the backend).
pub trait BlockIOSetLen: BlockIO {
    /// Sets the length of the storage.
    fn set_len(&mut self, len: u64) -> BlockIOResult;
}

/// Extension trait for reading and writing structs using zerocopy.
///
/// Provides helpers to read a struct from a given offset and write a struct
/// at a given offset. Requires the struct to implement zerocopy traits for
/// safe conversion.
pub trait BlockIOStructExt: BlockIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
    ) -> BlockIOResult<T> {
        let size = core::mem::size_of::<T>();
        assert!(size <= BLOCK_BUF_SIZE, "read_struct: type too large");
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| BlockIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> BlockIOResult {
        let bytes = val.as_bytes();
        self.write_at(offset, bytes)
    }
}

impl<T: BlockIO + ?Sized> BlockIOStructExt for T {}
