// SPDX-License-Identifier: MIT

//! The on-disk `disklabel` record and its codec.
//!
//! The label lives at a fixed byte offset inside the boot block and is
//! covered by a 16-bit XOR checksum from the start of the header through
//! the last live partition slot. Field order and widths follow the
//! classic 4.4BSD layout; all multi-byte fields are little-endian.

use bitflags::bitflags;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::bootblock::BootBlock;
use crate::errors::{LabelError, LabelResult};
use crate::fstype::BSD_FS_UNUSED;
use crate::platform::Platform;

/// The magic number, stored twice in every valid label.
pub const BSD_DISKMAGIC: u32 = 0x8256_4557;

/// Fixed upper bound on partition slots ("a" through "p").
pub const BSD_MAXPARTITIONS: usize = 16;

/// Size of the boot area at sector 0, bytes.
pub const BSD_BBSIZE: usize = 8192;

/// Maximum size of a filesystem superblock, bytes.
pub const BSD_SBSIZE: u32 = 8192;

/// Serialized size of the label header, up to the partition table.
pub const BSD_DISKLABEL_HEADER_SIZE: usize = 148;

/// Serialized size of the whole record, header plus 16 partition slots.
pub const BSD_DISKLABEL_SIZE: usize =
    BSD_DISKLABEL_HEADER_SIZE + BSD_MAXPARTITIONS * core::mem::size_of::<Partition>();

bitflags! {
    /// `d_flags` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiskFlags: u32 {
        /// Removable media.
        const REMOVABLE = 0x01;
        /// Supports ECC.
        const ECC = 0x02;
        /// Supports bad-sector forwarding.
        const BADSECT = 0x04;
        /// Label lives within an MS-DOS partition.
        const DOSPART = 0x20;
    }
}

/// One partition slot. `size == 0` means the slot is unused.
///
/// `offset` and `size` are in 512-byte sectors, relative to the start of
/// the whole disk even when the label is nested in a DOS partition.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Partition {
    pub size: u32,
    pub offset: u32,
    /// Filesystem basic fragment size.
    pub fsize: u32,
    /// Filesystem type, see the fstype table.
    pub fstype: u8,
    /// Filesystem fragments per block.
    pub frag: u8,
    /// Filesystem cylinders per group.
    pub cpg: u16,
}

impl Partition {
    #[inline]
    pub fn is_used(&self) -> bool {
        self.size > 0
    }

    pub fn clear(&mut self) {
        *self = Partition::new_zeroed();
        self.fstype = BSD_FS_UNUSED;
    }
}

/// In-memory mirror of the on-disk label header and partition table.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Disklabel {
    pub magic: u32,
    /// Drive type, display-only.
    pub dtype: u16,
    pub subtype: u16,
    /// Type name, e.g. "eagle". Raw bytes, not NUL-terminated.
    pub typename: [u8; 16],
    /// Pack identifier. Raw bytes, not NUL-terminated.
    pub packname: [u8; 16],
    /// Bytes per (label-internal) sector.
    pub secsize: u32,
    /// Data sectors per track.
    pub nsectors: u32,
    /// Tracks per cylinder (heads).
    pub ntracks: u32,
    pub ncylinders: u32,
    pub secpercyl: u32,
    pub secperunit: u32,
    pub sparespertrack: u16,
    pub sparespercyl: u16,
    pub acylinders: u32,
    pub rpm: u16,
    pub interleave: u16,
    pub trackskew: u16,
    pub cylskew: u16,
    /// Head switch time, usec.
    pub headswitch: u32,
    /// Track-to-track seek, usec.
    pub trkseek: u32,
    pub flags: u32,
    pub drivedata: [u32; 5],
    pub spare: [u32; 5],
    pub magic2: u32,
    /// XOR of the record including the live partition slots.
    pub checksum: u16,
    pub npartitions: u16,
    pub bbsize: u32,
    pub sbsize: u32,
    pub partitions: [Partition; BSD_MAXPARTITIONS],
}

const _: () = assert!(core::mem::size_of::<Partition>() == 16);
const _: () = assert!(core::mem::size_of::<Disklabel>() == BSD_DISKLABEL_SIZE);
const _: () = assert!(core::mem::offset_of!(Disklabel, magic2) == 132);
const _: () = assert!(core::mem::offset_of!(Disklabel, checksum) == 136);
const _: () = assert!(core::mem::offset_of!(Disklabel, partitions) == BSD_DISKLABEL_HEADER_SIZE);

/// XOR of the label bytes as 16-bit little-endian words, from the start of
/// the header through the last live partition slot.
///
/// The stored `checksum` word takes part, so a correctly serialized label
/// sums to zero; when (re)computing a checksum the field must be zeroed
/// first.
pub fn dkcksum(d: &Disklabel) -> u16 {
    let live = (d.npartitions as usize).min(BSD_MAXPARTITIONS);
    let end = BSD_DISKLABEL_HEADER_SIZE + live * core::mem::size_of::<Partition>();
    d.as_bytes()[..end]
        .chunks_exact(2)
        .fold(0u16, |sum, w| sum ^ u16::from_le_bytes([w[0], w[1]]))
}

impl Disklabel {
    pub fn flags(&self) -> DiskFlags {
        DiskFlags::from_bits_truncate(self.flags)
    }

    /// Extracts the label embedded in `bb` and normalizes it.
    ///
    /// A magic mismatch is `NotFound` (a parse outcome, not an I/O error).
    /// Trailing slots are zeroed; an overlong partition count is clamped to
    /// [`BSD_MAXPARTITIONS`] and the raw count is returned so the caller can
    /// surface a warning. The label is still accepted in that case.
    pub fn parse(bb: &BootBlock, platform: &Platform) -> LabelResult<(Self, Option<u16>)> {
        let raw = &bb.bytes()[platform.label_region()];
        let mut d = Disklabel::read_from_bytes(raw)
            .map_err(|_| LabelError::Corrupt("short label region"))?;

        if d.magic != BSD_DISKMAGIC || d.magic2 != BSD_DISKMAGIC {
            return Err(LabelError::NotFound);
        }

        let mut clamped = None;
        if d.npartitions as usize > BSD_MAXPARTITIONS {
            clamped = Some(d.npartitions);
            d.npartitions = BSD_MAXPARTITIONS as u16;
        }
        for slot in d.partitions.iter_mut().skip(d.npartitions as usize) {
            slot.clear();
        }

        Ok((d, clamped))
    }

    /// Recomputes the checksum and copies the record back into `bb` at the
    /// platform's label offset, leaving every adjacent boot-block byte
    /// untouched.
    pub fn store(&mut self, bb: &mut BootBlock, platform: &Platform) {
        self.checksum = 0;
        self.checksum = dkcksum(self);
        bb.bytes_mut()[platform.label_region()].copy_from_slice(self.as_bytes());
    }
}
