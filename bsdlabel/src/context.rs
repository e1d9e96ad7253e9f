// SPDX-License-Identifier: MIT

use bsdio::BlockIO;

use crate::geometry::Geometry;
use crate::mbr::Mbr;
use crate::platform::Platform;
use crate::DEFAULT_SECTOR_SIZE;

/// The parent DOS label a nested disklabel lives under. Non-owning: the
/// parent context outlives the BSD one, and the driver never copies the
/// partition records out of it.
#[derive(Clone, Copy, Debug)]
pub struct ParentMbr<'d> {
    pub table: &'d Mbr,
    pub dev_path: &'d str,
}

/// Everything the disklabel driver needs to know about the device it is
/// operating on. Owned by the surrounding framework; one context per
/// device, operations serialized by the caller.
pub struct DiskContext<'d> {
    pub io: &'d mut dyn BlockIO,
    pub dev_path: String,
    /// Native sector size of the device. May exceed 512; disklabel-internal
    /// offsets keep using 512-byte sectors regardless.
    pub sector_size: u64,
    pub geom: Geometry,
    /// Show cylinders instead of sectors in prompts and listings.
    pub cylinder_units: bool,
    /// Include the geometry header when listing.
    pub display_details: bool,
    pub platform: Platform,
    pub parent: Option<ParentMbr<'d>>,
}

impl<'d> DiskContext<'d> {
    pub fn new(io: &'d mut dyn BlockIO, dev_path: impl Into<String>) -> Self {
        Self {
            io,
            dev_path: dev_path.into(),
            sector_size: DEFAULT_SECTOR_SIZE,
            geom: Geometry::default(),
            cylinder_units: false,
            display_details: false,
            platform: Platform::default(),
            parent: None,
        }
    }

    pub fn with_geometry(mut self, geom: Geometry) -> Self {
        self.geom = geom;
        self
    }

    pub fn with_sector_size(mut self, sector_size: u64) -> Self {
        self.sector_size = sector_size;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_parent(mut self, parent: ParentMbr<'d>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn use_cylinders(mut self, yes: bool) -> Self {
        self.cylinder_units = yes;
        self
    }
}

/// Device name of partition `partno` (1-based) on `dev`, following the
/// kernel convention: a `p` separator when the base name ends in a digit.
pub fn partname(dev: &str, partno: usize) -> String {
    if dev.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{dev}p{partno}")
    } else {
        format!("{dev}{partno}")
    }
}
