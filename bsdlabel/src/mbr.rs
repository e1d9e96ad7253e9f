// SPDX-License-Identifier: MIT

//! Just enough DOS/MBR support to host a nested BSD disklabel: the classic
//! boot-sector layout, entry accessors, and the BSD-family type test.

use bsdio::prelude::*;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{LabelError, LabelResult};

pub const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const MBR_PRIMARY_ENTRIES: usize = 4;

pub const MBR_FREEBSD_PARTITION: u8 = 0xA5;
pub const MBR_OPENBSD_PARTITION: u8 = 0xA6;
pub const MBR_NETBSD_PARTITION: u8 = 0xA9;

/// XORed into a system byte to hide a partition from boot selectors.
pub const MBR_HIDDEN_MASK: u8 = 0x10;

/// True for the FreeBSD/NetBSD/OpenBSD system bytes and their hidden
/// variants; only such partitions may host a nested disklabel.
pub fn is_bsd_partition_type(sys_ind: u8) -> bool {
    matches!(
        sys_ind,
        MBR_FREEBSD_PARTITION | MBR_NETBSD_PARTITION | MBR_OPENBSD_PARTITION
    ) || matches!(
        sys_ind ^ MBR_HIDDEN_MASK,
        MBR_FREEBSD_PARTITION | MBR_NETBSD_PARTITION | MBR_OPENBSD_PARTITION
    )
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct MbrEntry {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub sys_ind: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntry {
    #[inline]
    pub fn new(boot_flag: u8, sys_ind: u8, start_lba: u32, sectors: u32) -> Self {
        Self {
            boot_flag,
            starting_chs: [0, 0, 0],
            sys_ind,
            end_chs: [0, 0, 0],
            start_lba,
            sectors,
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new(0x00, 0x00, 0, 0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sys_ind == 0
    }

    /// Starting sector, in the device's native sector size.
    #[inline]
    pub fn start(&self) -> u64 {
        self.start_lba as u64
    }

    /// Sector count, in the device's native sector size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.sectors as u64
    }
}

/// On-disk entry: identical fields, but packed because the partition table
/// starts at byte 446 and the LBA words land unaligned.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct MbrEntryPacked {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub sys_ind: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntryPacked {
    #[inline]
    pub fn to_aligned(self) -> MbrEntry {
        MbrEntry {
            boot_flag: self.boot_flag,
            starting_chs: self.starting_chs,
            sys_ind: self.sys_ind,
            end_chs: self.end_chs,
            start_lba: u32::from_le(self.start_lba),
            sectors: u32::from_le(self.sectors),
        }
    }

    #[inline]
    pub fn from_aligned(e: &MbrEntry) -> Self {
        Self {
            boot_flag: e.boot_flag,
            starting_chs: e.starting_chs,
            sys_ind: e.sys_ind,
            end_chs: e.end_chs,
            start_lba: e.start_lba.to_le(),
            sectors: e.sectors.to_le(),
        }
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Mbr {
    pub boot_code: [u8; 446],
    pub entries: [MbrEntryPacked; 4],
    pub signature: [u8; 2],
}

const _: () = assert!(core::mem::size_of::<Mbr>() == 512);

impl Mbr {
    #[inline]
    pub fn new_from_entries(entries: [MbrEntry; 4]) -> Self {
        let packed = entries.map(|e| MbrEntryPacked::from_aligned(&e));
        Self {
            boot_code: [0u8; 446],
            entries: packed,
            signature: MBR_SIGNATURE,
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new_from_entries([MbrEntry::new_empty(); 4])
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == MBR_SIGNATURE
    }

    /// Primary entry `i`, decoded. `None` past the table.
    #[inline]
    pub fn entry(&self, i: usize) -> Option<MbrEntry> {
        self.entries.get(i).map(|e| e.to_aligned())
    }

    #[inline]
    pub fn set_entry(&mut self, i: usize, e: MbrEntry) {
        self.entries[i] = MbrEntryPacked::from_aligned(&e);
    }

    /// First entry a nested BSD disklabel could live in.
    pub fn first_bsd_entry(&self) -> Option<(usize, MbrEntry)> {
        (0..MBR_PRIMARY_ENTRIES)
            .filter_map(|i| self.entry(i).map(|e| (i, e)))
            .find(|(_, e)| is_bsd_partition_type(e.sys_ind))
    }
}

pub fn read_mbr(io: &mut dyn BlockIO) -> LabelResult<Mbr> {
    let mbr: Mbr = io.read_struct(0)?;
    if !mbr.has_valid_signature() {
        return Err(LabelError::NotFound);
    }
    Ok(mbr)
}

pub fn write_mbr(io: &mut dyn BlockIO, mbr: &Mbr) -> LabelResult<()> {
    io.write_struct(0, mbr)?;
    io.flush()?;
    Ok(())
}
