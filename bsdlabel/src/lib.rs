// SPDX-License-Identifier: MIT

#[macro_use]
mod macros;

pub mod bootblock;
pub mod bootstrap;
pub mod context;
pub mod dialog;
pub mod disklabel;
pub mod errors;
pub mod fstype;
pub mod geometry;
pub mod label;
pub mod mbr;
pub mod ops;
pub mod platform;

#[allow(clippy::single_component_path_imports)]
use paste;

/// Sector unit used by disklabel offsets, regardless of the device's
/// native sector size.
pub const DEFAULT_SECTOR_SIZE: u64 = 512;
