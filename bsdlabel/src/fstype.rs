// SPDX-License-Identifier: MIT

//! Filesystem-type and drive-type tables for BSD disklabels.

use crate::platform::Platform;

define_fs_types! {
    Unused => 0x00, "unused",
    Swap => 0x01, "swap",
    V6 => 0x02, "Version 6",
    V7 => 0x03, "Version 7",
    SysV => 0x04, "System V",
    V71K => 0x05, "4.1BSD",
    V8 => 0x06, "Eighth Edition",
    Bsdffs => 0x07, "4.2BSD",
    Msdos => 0x08, "MS-DOS",
    Bsdlfs => 0x09, "4.4LFS",
    Other => 0x0a, "unknown",
    Hpfs => 0x0b, "HPFS",
    Iso9660 => 0x0c, "ISO-9660",
    Boot => 0x0d, "boot",
    Ados => 0x0e, "ADOS",
    Hfs => 0x0f, "HFS",
    Advfs => 0x10, "AdvFS",
}

/// Display name for an fstype code. Code 8 is shared between MS-DOS and
/// ext2; the Alpha table names it "ext2".
pub fn fstype_name(code: u8, platform: &Platform) -> &'static str {
    if code == BSD_FS_MSDOS && platform.ext2_alias {
        return "ext2";
    }
    FsKind::from_code(code).name()
}

// Drive types. Display-only.
pub const BSD_DTYPE_SMD: u16 = 1;
pub const BSD_DTYPE_MSCP: u16 = 2;
pub const BSD_DTYPE_DEC: u16 = 3;
pub const BSD_DTYPE_SCSI: u16 = 4;
pub const BSD_DTYPE_ESDI: u16 = 5;
pub const BSD_DTYPE_ST506: u16 = 6;
pub const BSD_DTYPE_HPIB: u16 = 7;
pub const BSD_DTYPE_HPFL: u16 = 8;
pub const BSD_DTYPE_TYPE9: u16 = 9;
pub const BSD_DTYPE_FLOPPY: u16 = 10;

const DKTYPE_NAMES: [&str; 11] = [
    "unknown", "SMD", "MSCP", "old DEC", "SCSI", "ESDI", "ST506", "HP-IB", "HP-FL", "type 9",
    "floppy",
];

/// Drive-type display name, `None` for out-of-table values.
pub fn dtype_name(dtype: u16) -> Option<&'static str> {
    DKTYPE_NAMES.get(dtype as usize).copied()
}

/// Maps a DOS/MBR system byte onto the BSD fstype used when linking an MBR
/// partition into the disklabel.
pub fn translate_dos_fstype(sys_ind: u8) -> u8 {
    match sys_ind {
        0x01 // DOS 12-bit FAT
        | 0x04 // DOS 16-bit <32M
        | 0x06 // DOS 16-bit >=32M
        | 0xe1 // DOS access
        | 0xe3 // DOS R/O
        | 0xf2 // DOS secondary
            => BSD_FS_MSDOS,
        0x07 // OS/2 HPFS
            => BSD_FS_HPFS,
        _ => BSD_FS_OTHER,
    }
}
