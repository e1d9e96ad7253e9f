// SPDX-License-Identifier: MIT

//! The boot block: bootstrap code plus the embedded disklabel, read and
//! written as one `BSD_BBSIZE` unit so the bytes around the label always
//! round-trip unchanged.

use bsdio::prelude::*;

use crate::disklabel::BSD_BBSIZE;

/// Fixed-size buffer holding the boot area of the disk (or of the
/// containing DOS partition): first-stage bootstrap, embedded disklabel,
/// second-stage bootstrap.
#[derive(Debug, Clone)]
pub struct BootBlock {
    buf: Box<[u8; BSD_BBSIZE]>,
}

impl BootBlock {
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; BSD_BBSIZE]),
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..]
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..]
    }

    /// Fills the buffer from the device, starting at byte `base`.
    pub fn read_from(&mut self, io: &mut dyn BlockIO, base: u64) -> BlockIOResult {
        io.read_at(base, &mut self.buf[..])
    }

    /// Writes the whole buffer to the device at byte `base` and flushes.
    pub fn write_to(&self, io: &mut dyn BlockIO, base: u64) -> BlockIOResult {
        io.write_at(base, &self.buf[..])?;
        io.flush()
    }
}

impl Default for BootBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Alpha boot-block checksum: the first 504 bytes of sector 0 as 63
/// little-endian quadwords, summed with wrapping addition into the 64th.
pub fn alpha_bootblock_checksum(block: &mut [u8]) {
    let mut sum = 0u64;
    for word in block[..504].chunks_exact(8) {
        sum = sum.wrapping_add(u64::from_le_bytes(word.try_into().unwrap()));
    }
    block[504..512].copy_from_slice(&sum.to_le_bytes());
}
