// SPDX-License-Identifier: MIT

//! The BSD disklabel driver: lifecycle of one label instance and the
//! partition editing operations on it.

use log::debug;
use zerocopy::FromZeros;

use crate::bootblock::{alpha_bootblock_checksum, BootBlock};
use crate::context::{partname, DiskContext};
use crate::dialog::{Dialog, Report};
use crate::disklabel::{
    DiskFlags, Disklabel, Partition, BSD_BBSIZE, BSD_DISKMAGIC, BSD_MAXPARTITIONS, BSD_SBSIZE,
};
use crate::errors::{LabelError, LabelResult};
use crate::fstype::{
    dtype_name, fstype_name, BSD_DTYPE_SCSI, BSD_DTYPE_ST506, BSD_FS_BSDFFS, BSD_FS_UNUSED,
};
use crate::geometry::{
    cround, cylinder_first_sector, cylinder_last_sector, display_end, display_start,
};
use crate::mbr::{is_bsd_partition_type, MbrEntry, MBR_PRIMARY_ENTRIES};
use crate::ops::{format_row, header_row, partition_letter, LabelOps, PartitionView};
use crate::DEFAULT_SECTOR_SIZE;

/// Lifecycle of a label instance.
///
/// `Fresh` and `Dirty` both mean "in memory ahead of the disk"; they only
/// differ in how the label came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelState {
    /// Nothing probed, read or created yet.
    None,
    /// Initialized by `create`, never written.
    Fresh,
    /// In sync with the device.
    Loaded,
    /// Edited since the last read or write.
    Dirty,
}

/// One BSD disklabel bound to a device context, possibly nested inside a
/// DOS partition of the parent label.
pub struct BsdLabel {
    label: Disklabel,
    boot: BootBlock,
    /// Index of the assigned partition in the parent MBR, when nested.
    dos_part: Option<usize>,
    state: LabelState,
}

impl BsdLabel {
    pub fn new() -> Self {
        Self {
            label: Disklabel::new_zeroed(),
            boot: BootBlock::new(),
            dos_part: None,
            state: LabelState::None,
        }
    }

    #[inline]
    pub fn disklabel(&self) -> &Disklabel {
        &self.label
    }

    #[inline]
    pub fn state(&self) -> LabelState {
        self.state
    }

    /// True when the in-memory label is ahead of the device.
    #[inline]
    pub fn is_changed(&self) -> bool {
        matches!(self.state, LabelState::Fresh | LabelState::Dirty)
    }

    #[inline]
    pub(crate) fn boot_block(&self) -> &BootBlock {
        &self.boot
    }

    #[inline]
    pub(crate) fn boot_block_mut(&mut self) -> &mut BootBlock {
        &mut self.boot
    }

    pub(crate) fn require_label(&self) -> LabelResult {
        if matches!(self.state, LabelState::None) {
            return Err(LabelError::Invalid("no disklabel"));
        }
        Ok(())
    }

    fn mark_dirty(&mut self) {
        if !matches!(self.state, LabelState::Fresh) {
            self.state = LabelState::Dirty;
        }
    }

    /// The assigned DOS partition, resolved through the parent table.
    pub(crate) fn assigned_dos(&self, ctx: &DiskContext<'_>) -> Option<MbrEntry> {
        let idx = self.dos_part?;
        ctx.parent.and_then(|p| p.table.entry(idx))
    }

    /// Byte offset of the boot block on the device: the start of the
    /// containing DOS partition in native sectors, or 0 for a whole disk.
    pub(crate) fn base_offset(&self, ctx: &DiskContext<'_>) -> u64 {
        self.assigned_dos(ctx)
            .map(|p| p.start() * ctx.sector_size)
            .unwrap_or(0)
    }

    /// Looks for a DOS partition usable for a nested BSD partition table.
    /// `Ok(false)` when there is none (or its start sector is 0); both are
    /// warned about but not errors.
    fn assign_dos_partition(
        &mut self,
        ctx: &mut DiskContext<'_>,
        report: &mut dyn Report,
    ) -> LabelResult<bool> {
        let Some(parent) = ctx.parent else {
            return Ok(false);
        };

        for i in 0..MBR_PRIMARY_ENTRIES {
            let Some(e) = parent.table.entry(i) else {
                continue;
            };
            if !is_bsd_partition_type(e.sys_ind) {
                continue;
            }

            if e.start() == 0 {
                report.warn(
                    &ctx.dev_path,
                    &format!("Partition {}: has invalid starting sector 0.", i + 1),
                );
                return Ok(false);
            }

            ctx.dev_path = partname(parent.dev_path, i + 1);
            self.dos_part = Some(i);
            debug!("partition {} assigned to BSD", i + 1);
            return Ok(true);
        }

        report.warn(
            &ctx.dev_path,
            &format!("There is no *BSD partition on {}.", parent.dev_path),
        );
        self.dos_part = None;
        Ok(false)
    }

    /// Probes for an existing label; nested contexts first pick the DOS
    /// partition to look inside. Found/not-found, not an error.
    pub fn probe(
        &mut self,
        ctx: &mut DiskContext<'_>,
        report: &mut dyn Report,
    ) -> LabelResult<bool> {
        if ctx.parent.is_some() && !self.assign_dos_partition(ctx, report)? {
            return Ok(false);
        }
        self.read(ctx, report)
    }

    /// Reads the boot block and extracts the label. `Ok(false)` when the
    /// magic is missing; I/O failures are real errors.
    pub fn read(
        &mut self,
        ctx: &mut DiskContext<'_>,
        report: &mut dyn Report,
    ) -> LabelResult<bool> {
        let base = self.base_offset(ctx);
        self.boot.read_from(ctx.io, base)?;

        match Disklabel::parse(&self.boot, &ctx.platform) {
            Ok((d, clamped)) => {
                if let Some(raw) = clamped {
                    report.warn(
                        &ctx.dev_path,
                        &format!(
                            "Too many partitions ({raw}, maximum is {BSD_MAXPARTITIONS})."
                        ),
                    );
                }
                self.label = d;
                self.state = LabelState::Loaded;
                debug!("read BSD label at offset {base}");
                Ok(true)
            }
            Err(LabelError::NotFound) => {
                debug!("not found magic");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a fresh default label after confirmation. `Ok(false)` when
    /// the user declined; a nested context without a usable DOS partition
    /// is an error.
    pub fn create(
        &mut self,
        ctx: &mut DiskContext<'_>,
        dialog: &mut dyn Dialog,
        report: &mut dyn Report,
    ) -> LabelResult<bool> {
        report.info(
            &ctx.dev_path,
            &format!("The device {} does not contain BSD disklabel.", ctx.dev_path),
        );
        if !dialog.ask_yesno("Do you want to create a BSD disklabel?")? {
            return Ok(false);
        }

        if ctx.parent.is_some() && !self.assign_dos_partition(ctx, report)? {
            return Err(LabelError::Invalid(
                "no DOS partition usable for a BSD disklabel",
            ));
        }

        self.init_label(ctx);
        self.state = LabelState::Fresh;

        let details = ctx.display_details;
        ctx.display_details = true;
        let listed = self.list(ctx, report);
        ctx.display_details = details;
        listed?;

        Ok(true)
    }

    fn init_label(&mut self, ctx: &DiskContext<'_>) {
        let dos = self.assigned_dos(ctx);
        let d = &mut self.label;
        *d = Disklabel::new_zeroed();

        d.magic = BSD_DISKMAGIC;
        d.magic2 = BSD_DISKMAGIC;

        d.dtype = if ctx.dev_path.starts_with("/dev/sd") {
            BSD_DTYPE_SCSI
        } else {
            BSD_DTYPE_ST506
        };
        d.flags = ctx.platform.default_flags.bits();

        d.secsize = DEFAULT_SECTOR_SIZE as u32;
        d.nsectors = ctx.geom.sectors;
        d.ntracks = ctx.geom.heads;
        d.ncylinders = ctx.geom.cylinders;
        d.secpercyl = ctx.geom.secpercyl();
        d.secperunit = d.secpercyl * d.ncylinders;

        d.rpm = 3600;
        d.interleave = 1;
        d.bbsize = BSD_BBSIZE as u32;
        d.sbsize = BSD_SBSIZE;

        if let Some(p) = dos {
            d.npartitions = 4;

            // Partition "c" is the containing DOS partition.
            d.partitions[2] = Partition {
                size: p.sectors,
                offset: p.start_lba,
                fsize: 0,
                fstype: BSD_FS_UNUSED,
                frag: 0,
                cpg: 0,
            };
            // Partition "d" is the whole disk.
            d.partitions[3] = Partition {
                size: d.secperunit,
                offset: 0,
                fsize: 0,
                fstype: BSD_FS_UNUSED,
                frag: 0,
                cpg: 0,
            };
        } else {
            d.npartitions = 3;

            // Partition "c" is the whole disk.
            d.partitions[2] = Partition {
                size: d.secperunit,
                offset: 0,
                fsize: 0,
                fstype: BSD_FS_UNUSED,
                frag: 0,
                cpg: 0,
            };
        }
    }

    /// Serializes the label into the boot block and writes the whole block
    /// back to the device.
    pub fn write(
        &mut self,
        ctx: &mut DiskContext<'_>,
        report: &mut dyn Report,
    ) -> LabelResult {
        self.require_label()?;
        let base = self.base_offset(ctx);

        self.label.store(&mut self.boot, &ctx.platform);
        if ctx.platform.boot_checksum && ctx.platform.label_sector == 0 {
            alpha_bootblock_checksum(self.boot.bytes_mut());
        }

        self.boot.write_to(ctx.io, base)?;
        report.info(&ctx.dev_path, "Syncing disks.");

        self.state = LabelState::Loaded;
        report.success(
            &ctx.dev_path,
            &format!("Disklabel written to {}.", ctx.dev_path),
        );
        Ok(())
    }

    /// Lists the label through the report sink: the geometry details when
    /// the context asks for them, then the partition table.
    pub fn list(&self, ctx: &DiskContext<'_>, report: &mut dyn Report) -> LabelResult {
        self.require_label()?;
        let d = &self.label;
        let dev = &ctx.dev_path;

        if ctx.display_details {
            report.info(dev, &format!("# {dev}:"));

            match dtype_name(d.dtype) {
                Some(name) => report.info(dev, &format!("type: {name}")),
                None => report.info(dev, &format!("type: {}", d.dtype)),
            }
            report.info(dev, &format!("disk: {}", fixed_str(&d.typename)));
            report.info(dev, &format!("label: {}", fixed_str(&d.packname)));

            let flags = d.flags();
            let flag_name = if flags.contains(DiskFlags::REMOVABLE) {
                "removable"
            } else if flags.contains(DiskFlags::ECC) {
                "ecc"
            } else if flags.contains(DiskFlags::BADSECT) {
                "badsect"
            } else {
                ""
            };
            report.info(dev, &format!("flags: {flag_name}"));

            report.info(dev, &format!("bytes/sector: {}", d.secsize));
            report.info(dev, &format!("sectors/track: {}", d.nsectors));
            report.info(dev, &format!("tracks/cylinder: {}", d.ntracks));
            report.info(dev, &format!("sectors/cylinder: {}", d.secpercyl));
            report.info(dev, &format!("cylinders: {}", d.ncylinders));
            report.info(dev, &format!("rpm: {}", d.rpm));
            report.info(dev, &format!("interleave: {}", d.interleave));
            report.info(dev, &format!("trackskew: {}", d.trackskew));
            report.info(dev, &format!("cylinderskew: {}", d.cylskew));
            report.info(
                dev,
                &format!("headswitch: {} (milliseconds)", d.headswitch),
            );
            report.info(
                dev,
                &format!("track-to-track seek: {} (milliseconds)", d.trkseek),
            );
        }

        report.info(dev, &format!("partitions: {}", d.npartitions));

        report.info(dev, &header_row());
        for i in 0..d.npartitions as usize {
            let view = self.get_part(ctx, i)?;
            if !view.used {
                continue;
            }

            let mark = |exact: bool| if exact { "" } else { "*" };
            let cells = [
                partition_letter(i).to_string(),
                format!("{}{}", view.start, mark(view.start_exact)),
                format!("{}{}", view.end, mark(view.end_exact)),
                view.size_bytes.to_string(),
                fstype_name(view.fstype, &ctx.platform).to_string(),
                view.fsize.map(|v| v.to_string()).unwrap_or_default(),
                view.bsize.map(|v| v.to_string()).unwrap_or_default(),
                view.cpg.map(|v| v.to_string()).unwrap_or_default(),
            ];
            report.info(dev, &format_row(&cells));
        }

        Ok(())
    }

    /// Interactively fills slot `index`, prompting for the first and last
    /// sector (or cylinder) within the window the label may occupy.
    pub fn part_add(
        &mut self,
        ctx: &mut DiskContext<'_>,
        dialog: &mut dyn Dialog,
        index: usize,
    ) -> LabelResult {
        self.require_label()?;
        if index >= BSD_MAXPARTITIONS {
            return Err(LabelError::Invalid("partition index out of range"));
        }

        let d = &self.label;
        let (window_start, window_end) = match self.assigned_dos(ctx) {
            Some(p) => (p.start(), (p.start() + p.size()).saturating_sub(1)),
            None => (0, (d.secperunit as u64).saturating_sub(1)),
        };

        let cu = ctx.cylinder_units;
        let spc = d.secpercyl.max(1);

        let query = if cu { "First cylinder" } else { "First sector" };
        let low = cround(cu, spc, window_start);
        let high = cround(cu, spc, window_end);
        let mut begin = dialog.ask_number(low, low, high, query)?;
        if cu {
            begin = cylinder_first_sector(begin, spc);
        }

        let query = if cu {
            "Last cylinder, +cylinders or +size{K,M,G,T,P}"
        } else {
            "Last sector, +sectors or +size{K,M,G,T,P}"
        };
        let low = cround(cu, spc, begin);
        let high = cround(cu, spc, window_end);
        let mut end = dialog.ask_number(low, high, high, query)?;
        if cu {
            end = cylinder_last_sector(end, spc);
        }

        let d = &mut self.label;
        d.partitions[index] = Partition {
            size: (end - begin + 1) as u32,
            offset: begin as u32,
            fsize: 0,
            fstype: BSD_FS_UNUSED,
            frag: 0,
            cpg: 0,
        };
        if index >= d.npartitions as usize {
            d.npartitions = index as u16 + 1;
        }

        self.mark_dirty();
        Ok(())
    }

    /// Clears slot `index`; when it was the last live one, the partition
    /// count shrinks past every trailing empty slot.
    pub fn part_delete(&mut self, index: usize) -> LabelResult {
        self.require_label()?;
        if index >= BSD_MAXPARTITIONS {
            return Err(LabelError::Invalid("partition index out of range"));
        }

        let d = &mut self.label;
        d.partitions[index].clear();

        if d.npartitions as usize == index + 1 {
            while d.npartitions > 0 && !d.partitions[d.npartitions as usize - 1].is_used() {
                d.npartitions -= 1;
            }
        }

        self.mark_dirty();
        Ok(())
    }

    /// Displayable state of slot `index`, under the context's display mode.
    pub fn get_part(&self, ctx: &DiskContext<'_>, index: usize) -> LabelResult<PartitionView> {
        self.require_label()?;
        let d = &self.label;
        if index >= d.npartitions as usize {
            return Err(LabelError::Invalid("partition index out of range"));
        }

        let p = &d.partitions[index];
        let mut view = PartitionView {
            used: p.is_used(),
            start_exact: true,
            end_exact: true,
            ..PartitionView::default()
        };
        if !view.used {
            return Ok(view);
        }

        let offset = p.offset as u64;
        let size = p.size as u64;
        if ctx.cylinder_units && d.secpercyl != 0 {
            (view.start, view.start_exact) = display_start(offset, d.secpercyl);
            (view.end, view.end_exact) = display_end(offset, size, d.secpercyl);
        } else {
            view.start = offset;
            view.end = offset + size - 1;
        }

        view.size_bytes = size * ctx.sector_size;
        view.fstype = p.fstype;

        if p.fstype == BSD_FS_UNUSED || p.fstype == BSD_FS_BSDFFS {
            view.fsize = Some(p.fsize);
            view.bsize = Some(p.fsize * p.frag as u32);
        }
        if p.fstype == BSD_FS_BSDFFS {
            view.cpg = Some(p.cpg);
        }

        Ok(view)
    }

    /// Changes the fstype of slot `index`. A no-op when unchanged.
    pub fn part_set_type(&mut self, index: usize, fstype: u16) -> LabelResult {
        self.require_label()?;
        let d = &mut self.label;
        if index >= d.npartitions as usize {
            return Err(LabelError::Invalid("partition index out of range"));
        }
        if fstype > u8::MAX as u16 {
            return Err(LabelError::Invalid("fstype out of range"));
        }

        let p = &mut d.partitions[index];
        if p.fstype == fstype as u8 {
            return Ok(());
        }

        p.fstype = fstype as u8;
        self.mark_dirty();
        Ok(())
    }

    pub fn part_is_used(&self, index: usize) -> bool {
        if matches!(self.state, LabelState::None) || index >= BSD_MAXPARTITIONS {
            return false;
        }
        self.label.partitions[index].is_used()
    }

    /// Edits the geometry and performance fields of the label. Prompts are
    /// answered against a scratch copy; a cancelled prompt leaves the label
    /// untouched.
    pub fn edit_disklabel(
        &mut self,
        ctx: &mut DiskContext<'_>,
        dialog: &mut dyn Dialog,
    ) -> LabelResult {
        self.require_label()?;
        let mut d = self.label;

        if ctx.platform.prompt_geometry {
            d.secsize = dialog
                .ask_number(
                    DEFAULT_SECTOR_SIZE,
                    d.secsize as u64,
                    u32::MAX as u64,
                    "bytes/sector",
                )?
                .try_into()
                .unwrap_or(u32::MAX);
            d.nsectors = ask_u32(dialog, d.nsectors, "sectors/track")?;
            d.ntracks = ask_u32(dialog, d.ntracks, "tracks/cylinder")?;
            d.ncylinders = ask_u32(dialog, d.ncylinders, "cylinders")?;
        }

        let dflt = d.nsectors as u64 * d.ntracks as u64;
        d.secpercyl = dialog.ask_number(1, dflt, dflt, "sectors/cylinder")? as u32;

        d.rpm = ask_u16(dialog, d.rpm, "rpm")?;
        d.interleave = ask_u16(dialog, d.interleave, "interleave")?;
        d.trackskew = ask_u16(dialog, d.trackskew, "trackskew")?;
        d.cylskew = ask_u16(dialog, d.cylskew, "cylinderskew")?;

        d.headswitch = ask_u32(dialog, d.headswitch, "headswitch")?;
        d.trkseek = ask_u32(dialog, d.trkseek, "track-to-track seek")?;

        d.secperunit = d.secpercyl * d.ncylinders;

        self.label = d;
        self.mark_dirty();
        Ok(())
    }

    /// Links a partition of the parent DOS label into this disklabel,
    /// translating the DOS system byte to a BSD fstype.
    pub fn link_partition(
        &mut self,
        ctx: &mut DiskContext<'_>,
        dialog: &mut dyn Dialog,
        report: &mut dyn Report,
    ) -> LabelResult {
        self.require_label()?;
        let Some(parent) = ctx.parent else {
            report.warn(
                &ctx.dev_path,
                "BSD label is not nested within a DOS partition",
            );
            return Err(LabelError::Invalid("not a nested BSD label"));
        };

        let k = dialog.ask_partnum(MBR_PRIMARY_ENTRIES, "DOS partition")?;
        let i = dialog.ask_partnum(BSD_MAXPARTITIONS, "BSD partition")?;
        if i >= BSD_MAXPARTITIONS {
            return Err(LabelError::Invalid("partition index out of range"));
        }

        let p = parent
            .table
            .entry(k)
            .ok_or(LabelError::Invalid("partition index out of range"))?;

        let d = &mut self.label;
        d.partitions[i] = Partition {
            size: p.sectors,
            offset: p.start_lba,
            fsize: 0,
            fstype: crate::fstype::translate_dos_fstype(p.sys_ind),
            frag: 0,
            cpg: 0,
        };
        if i >= d.npartitions as usize {
            d.npartitions = i as u16 + 1;
        }

        self.mark_dirty();
        report.success(
            &ctx.dev_path,
            &format!(
                "BSD partition '{}' linked to DOS partition {}.",
                partition_letter(i),
                k + 1
            ),
        );
        Ok(())
    }
}

impl Default for BsdLabel {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelOps for BsdLabel {
    fn probe(&mut self, ctx: &mut DiskContext<'_>, report: &mut dyn Report) -> LabelResult<bool> {
        BsdLabel::probe(self, ctx, report)
    }

    fn list(&self, ctx: &DiskContext<'_>, report: &mut dyn Report) -> LabelResult {
        BsdLabel::list(self, ctx, report)
    }

    fn write(&mut self, ctx: &mut DiskContext<'_>, report: &mut dyn Report) -> LabelResult {
        BsdLabel::write(self, ctx, report)
    }

    fn create(
        &mut self,
        ctx: &mut DiskContext<'_>,
        dialog: &mut dyn Dialog,
        report: &mut dyn Report,
    ) -> LabelResult<bool> {
        BsdLabel::create(self, ctx, dialog, report)
    }

    fn part_add(
        &mut self,
        ctx: &mut DiskContext<'_>,
        dialog: &mut dyn Dialog,
        index: usize,
    ) -> LabelResult {
        BsdLabel::part_add(self, ctx, dialog, index)
    }

    fn part_delete(&mut self, index: usize) -> LabelResult {
        BsdLabel::part_delete(self, index)
    }

    fn get_part(&self, ctx: &DiskContext<'_>, index: usize) -> LabelResult<PartitionView> {
        BsdLabel::get_part(self, ctx, index)
    }

    fn part_set_type(&mut self, index: usize, fstype: u16) -> LabelResult {
        BsdLabel::part_set_type(self, index, fstype)
    }

    fn part_is_used(&self, index: usize) -> bool {
        BsdLabel::part_is_used(self, index)
    }
}

/// Bytes of a fixed-width name field up to the first NUL, lossily decoded.
fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn ask_u32(dialog: &mut dyn Dialog, default: u32, query: &str) -> LabelResult<u32> {
    let low = default.min(1) as u64;
    dialog
        .ask_number(low, default as u64, u32::MAX as u64, query)
        .map(|v| v as u32)
}

fn ask_u16(dialog: &mut dyn Dialog, default: u16, query: &str) -> LabelResult<u16> {
    let low = default.min(1) as u64;
    dialog
        .ask_number(low, default as u64, u16::MAX as u64, query)
        .map(|v| v as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ParentMbr;
    use crate::dialog::{Answer, NullReport, Recorder, Scripted};
    use crate::disklabel::dkcksum;
    use crate::geometry::Geometry;
    use crate::mbr::{Mbr, MbrEntry, MBR_NETBSD_PARTITION};
    use crate::platform;
    use bsdio::prelude::*;

    const GEOM: Geometry = Geometry {
        heads: 16,
        sectors: 63,
        cylinders: 1024,
    };

    // Creates a fresh flat label over a RAM device.
    fn created_label(disk: &mut [u8]) -> BsdLabel {
        let mut io = MemBlockIO::new(disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut dialog = Scripted::new([Answer::YesNo(true)]);
        let mut label = BsdLabel::new();
        let created = label
            .create(&mut ctx, &mut dialog, &mut NullReport)
            .unwrap();
        assert!(created);
        label
    }

    #[test]
    fn fresh_flat_label_defaults() {
        // S1: heads=16, sectors=63, cylinders=1024, secsize=512.
        let mut disk = vec![0u8; BSD_BBSIZE];
        let label = created_label(&mut disk);
        let d = label.disklabel();

        assert_eq!(d.magic, BSD_DISKMAGIC);
        assert_eq!(d.magic2, BSD_DISKMAGIC);
        assert_eq!(d.secpercyl, 1008);
        assert_eq!(d.secperunit, 1_032_192);
        assert_eq!(d.npartitions, 3);
        assert_eq!(d.partitions[2].offset, 0);
        assert_eq!(d.partitions[2].size, 1_032_192);
        assert_eq!(d.partitions[2].fstype, BSD_FS_UNUSED);
        assert_eq!(d.dtype, BSD_DTYPE_SCSI);
        assert_eq!(label.state(), LabelState::Fresh);
        assert!(label.is_changed());
    }

    #[test]
    fn fresh_label_checksums_to_zero_once_stored() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        label.write(&mut ctx, &mut NullReport).unwrap();

        assert_eq!(dkcksum(label.disklabel()), 0);
        assert_eq!(label.state(), LabelState::Loaded);
    }

    #[test]
    fn write_then_probe_round_trips() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);
        {
            let mut io = MemBlockIO::new(&mut disk);
            let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
            label.write(&mut ctx, &mut NullReport).unwrap();
        }

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut other = BsdLabel::new();
        assert!(other.probe(&mut ctx, &mut NullReport).unwrap());
        assert_eq!(other.disklabel(), label.disklabel());
        assert_eq!(other.state(), LabelState::Loaded);
    }

    #[test]
    fn probe_empty_disk_finds_nothing() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda");
        let mut label = BsdLabel::new();
        assert!(!label.probe(&mut ctx, &mut NullReport).unwrap());
        assert_eq!(label.state(), LabelState::None);
    }

    #[test]
    fn create_declined_is_not_an_error() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut dialog = Scripted::new([Answer::YesNo(false)]);
        let mut label = BsdLabel::new();
        let created = label
            .create(&mut ctx, &mut dialog, &mut NullReport)
            .unwrap();
        assert!(!created);
        assert_eq!(label.state(), LabelState::None);
    }

    #[test]
    fn nested_create_mirrors_dos_partition() {
        // S2: DOS parent with a BSD-typed child at start=2048, size=20480.
        let mut parent = Mbr::new_empty();
        parent.set_entry(1, MbrEntry::new(0x00, MBR_NETBSD_PARTITION, 2048, 20480));

        let mut disk = vec![0u8; 2048 * 512 + BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda")
            .with_geometry(GEOM)
            .with_parent(ParentMbr {
                table: &parent,
                dev_path: "/dev/sda",
            });

        let mut dialog = Scripted::new([Answer::YesNo(true)]);
        let mut label = BsdLabel::new();
        assert!(label.create(&mut ctx, &mut dialog, &mut NullReport).unwrap());

        let d = label.disklabel();
        assert_eq!(d.npartitions, 4);
        assert_eq!(d.partitions[2].offset, 2048);
        assert_eq!(d.partitions[2].size, 20480);
        assert_eq!(d.partitions[2].fstype, BSD_FS_UNUSED);
        assert_eq!(d.partitions[3].offset, 0);
        assert_eq!(d.partitions[3].size, d.secperunit);
        // Context now points at the partition device.
        assert_eq!(ctx.dev_path, "/dev/sda2");
    }

    #[test]
    fn nested_io_lands_at_dos_partition_offset() {
        // Invariant 6: nested read/write uses dos_start * sector_size.
        let mut parent = Mbr::new_empty();
        parent.set_entry(0, MbrEntry::new(0x00, MBR_NETBSD_PARTITION, 2048, 20480));

        let mut disk = vec![0u8; 2048 * 512 + BSD_BBSIZE];
        {
            let mut io = MemBlockIO::new(&mut disk);
            let mut ctx = DiskContext::new(&mut io, "/dev/sda")
                .with_geometry(GEOM)
                .with_parent(ParentMbr {
                    table: &parent,
                    dev_path: "/dev/sda",
                });

            let mut dialog = Scripted::new([Answer::YesNo(true)]);
            let mut label = BsdLabel::new();
            label.create(&mut ctx, &mut dialog, &mut NullReport).unwrap();
            label.write(&mut ctx, &mut NullReport).unwrap();
        }

        // The label header sits one label sector past the partition start.
        let base = 2048 * 512 + platform::GENERIC.label_byte_offset();
        assert_eq!(&disk[base..base + 4], &BSD_DISKMAGIC.to_le_bytes());
        // And nothing was written at the start of the disk.
        assert!(disk[..512].iter().all(|&b| b == 0));
    }

    #[test]
    fn nested_io_respects_native_sector_size() {
        // The DOS offset counts native (4 KiB) sectors, while the label
        // keeps addressing 512-byte sectors internally.
        let mut parent = Mbr::new_empty();
        parent.set_entry(0, MbrEntry::new(0x00, MBR_NETBSD_PARTITION, 4, 100));

        let mut disk = vec![0u8; 4 * 4096 + BSD_BBSIZE];
        {
            let mut io = MemBlockIO::new(&mut disk);
            let mut ctx = DiskContext::new(&mut io, "/dev/sda")
                .with_geometry(GEOM)
                .with_sector_size(4096)
                .with_parent(ParentMbr {
                    table: &parent,
                    dev_path: "/dev/sda",
                });

            let mut dialog = Scripted::new([Answer::YesNo(true)]);
            let mut label = BsdLabel::new();
            label.create(&mut ctx, &mut dialog, &mut NullReport).unwrap();
            label.write(&mut ctx, &mut NullReport).unwrap();
        }

        // Base offset 4 * 4096; the label still sits 512 bytes past it.
        let base = 4 * 4096 + platform::GENERIC.label_byte_offset();
        assert_eq!(&disk[base..base + 4], &BSD_DISKMAGIC.to_le_bytes());
    }

    #[test]
    fn nested_probe_rejects_zero_start() {
        let mut parent = Mbr::new_empty();
        parent.set_entry(0, MbrEntry::new(0x00, MBR_NETBSD_PARTITION, 0, 20480));

        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_parent(ParentMbr {
            table: &parent,
            dev_path: "/dev/sda",
        });

        let mut report = Recorder::default();
        let mut label = BsdLabel::new();
        assert!(!label.probe(&mut ctx, &mut report).unwrap());
        assert!(report.warnings[0].contains("invalid starting sector 0"));
    }

    #[test]
    fn nested_probe_without_bsd_child_warns() {
        let mut parent = Mbr::new_empty();
        parent.set_entry(0, MbrEntry::new(0x80, 0x83, 2048, 20480));

        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_parent(ParentMbr {
            table: &parent,
            dev_path: "/dev/sda",
        });

        let mut report = Recorder::default();
        let mut label = BsdLabel::new();
        assert!(!label.probe(&mut ctx, &mut report).unwrap());
        assert!(report.warnings[0].contains("no *BSD partition"));
    }

    #[test]
    fn add_part_in_cylinder_mode() {
        // S3: secpercyl=1008, first cylinder 2, last cylinder 5.
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda")
            .with_geometry(GEOM)
            .use_cylinders(true);
        let mut dialog = Scripted::new([Answer::Number(2), Answer::Number(5)]);
        label.part_add(&mut ctx, &mut dialog, 0).unwrap();

        let p = &label.disklabel().partitions[0];
        assert_eq!(p.offset, 1008);
        assert_eq!(p.size, 4032);
        assert_eq!(p.fstype, BSD_FS_UNUSED);
        assert_eq!(label.disklabel().npartitions, 3);
    }

    #[test]
    fn add_part_in_sector_mode_reports_inputs_back() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let ctx = {
            let mut c = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
            let mut dialog = Scripted::new([Answer::Number(4096), Answer::Number(8191)]);
            label.part_add(&mut c, &mut dialog, 5).unwrap();
            c
        };

        assert_eq!(label.disklabel().npartitions, 6);
        let view = label.get_part(&ctx, 5).unwrap();
        assert!(view.used);
        assert_eq!(view.start, 4096);
        assert_eq!(view.end, 8191);
        assert!(view.start_exact && view.end_exact);
    }

    #[test]
    fn add_part_bad_index() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut dialog = Scripted::new([Answer::Number(0), Answer::Number(1)]);
        assert!(matches!(
            label.part_add(&mut ctx, &mut dialog, BSD_MAXPARTITIONS),
            Err(LabelError::Invalid(_))
        ));
    }

    #[test]
    fn delete_shrinks_past_trailing_holes() {
        // S4: npartitions=5 with only slot 4 live; deleting it shrinks to 0.
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        label.part_delete(2).unwrap(); // drop the whole-disk slot
        assert_eq!(label.disklabel().npartitions, 0);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut dialog = Scripted::new([Answer::Number(0), Answer::Number(1007)]);
        label.part_add(&mut ctx, &mut dialog, 4).unwrap();
        assert_eq!(label.disklabel().npartitions, 5);

        label.part_delete(4).unwrap();
        assert_eq!(label.disklabel().npartitions, 0);
        assert_eq!(label.state(), LabelState::Fresh);
    }

    #[test]
    fn delete_middle_slot_keeps_count() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut dialog = Scripted::new([
            Answer::Number(0),
            Answer::Number(1007),
            Answer::Number(1008),
            Answer::Number(2015),
        ]);
        label.part_add(&mut ctx, &mut dialog, 0).unwrap();
        label.part_add(&mut ctx, &mut dialog, 1).unwrap();

        label.part_delete(0).unwrap();
        assert_eq!(label.disklabel().npartitions, 3);
        assert!(!label.part_is_used(0));
        assert!(label.part_is_used(1));
    }

    #[test]
    fn link_copies_and_translates() {
        // S5: sys_ind=0x07, start=100, size=200 into BSD slot 5.
        let mut parent = Mbr::new_empty();
        parent.set_entry(0, MbrEntry::new(0x00, MBR_NETBSD_PARTITION, 2048, 20480));
        parent.set_entry(2, MbrEntry::new(0x00, 0x07, 100, 200));

        let mut disk = vec![0u8; 2048 * 512 + BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda")
            .with_geometry(GEOM)
            .with_parent(ParentMbr {
                table: &parent,
                dev_path: "/dev/sda",
            });

        let mut dialog = Scripted::new([Answer::YesNo(true)]);
        let mut label = BsdLabel::new();
        label.create(&mut ctx, &mut dialog, &mut NullReport).unwrap();

        let mut report = Recorder::default();
        let mut dialog = Scripted::new([Answer::PartNum(2), Answer::PartNum(5)]);
        label
            .link_partition(&mut ctx, &mut dialog, &mut report)
            .unwrap();

        let d = label.disklabel();
        assert_eq!(d.partitions[5].offset, 100);
        assert_eq!(d.partitions[5].size, 200);
        assert_eq!(d.partitions[5].fstype, crate::fstype::BSD_FS_HPFS);
        assert!(d.npartitions >= 6);
        assert!(report.successes[0].contains("'f' linked to DOS partition 3"));
    }

    #[test]
    fn link_requires_nested_context() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut dialog = Scripted::new([Answer::PartNum(0), Answer::PartNum(0)]);
        assert!(matches!(
            label.link_partition(&mut ctx, &mut dialog, &mut NullReport),
            Err(LabelError::Invalid(_))
        ));
    }

    #[test]
    fn set_type_validates_and_marks_dirty() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);
        {
            let mut io = MemBlockIO::new(&mut disk);
            let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
            label.write(&mut ctx, &mut NullReport).unwrap();
        }
        assert_eq!(label.state(), LabelState::Loaded);

        // Unchanged type: no-op, stays clean.
        label.part_set_type(2, BSD_FS_UNUSED as u16).unwrap();
        assert_eq!(label.state(), LabelState::Loaded);

        label.part_set_type(2, BSD_FS_BSDFFS as u16).unwrap();
        assert_eq!(label.state(), LabelState::Dirty);
        assert_eq!(label.disklabel().partitions[2].fstype, BSD_FS_BSDFFS);

        assert!(label.part_set_type(9, 1).is_err());
        assert!(label.part_set_type(2, 256).is_err());
    }

    #[test]
    fn get_part_populates_ffs_fields() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);
        {
            let d = &mut label.label;
            d.partitions[2].fstype = BSD_FS_BSDFFS;
            d.partitions[2].fsize = 1024;
            d.partitions[2].frag = 8;
            d.partitions[2].cpg = 16;
        }

        let mut io = MemBlockIO::new(&mut disk);
        let ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let view = label.get_part(&ctx, 2).unwrap();
        assert_eq!(view.fsize, Some(1024));
        assert_eq!(view.bsize, Some(8192));
        assert_eq!(view.cpg, Some(16));
        assert_eq!(view.size_bytes, 1_032_192 * 512);
    }

    #[test]
    fn get_part_cylinder_display_marks_inexact() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);
        {
            let d = &mut label.label;
            d.partitions[0] = Partition {
                size: 1500,
                offset: 500,
                fsize: 0,
                fstype: BSD_FS_UNUSED,
                frag: 0,
                cpg: 0,
            };
        }

        let mut io = MemBlockIO::new(&mut disk);
        let ctx = DiskContext::new(&mut io, "/dev/sda")
            .with_geometry(GEOM)
            .use_cylinders(true);
        let view = label.get_part(&ctx, 0).unwrap();
        assert_eq!(view.start, 1);
        assert!(!view.start_exact);
        assert_eq!(view.end, 2);
        assert!(!view.end_exact);
    }

    #[test]
    fn edit_commits_and_recomputes_secperunit() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let mut dialog = Scripted::new([
            Answer::Number(504),  // sectors/cylinder
            Answer::Number(7200), // rpm
            Answer::Number(1),    // interleave
            Answer::Number(0),    // trackskew
            Answer::Number(0),    // cylinderskew
            Answer::Number(0),    // headswitch
            Answer::Number(0),    // track-to-track seek
        ]);
        label.edit_disklabel(&mut ctx, &mut dialog).unwrap();

        let d = label.disklabel();
        assert_eq!(d.secpercyl, 504);
        assert_eq!(d.rpm, 7200);
        assert_eq!(d.secperunit, 504 * 1024);
    }

    #[test]
    fn edit_cancel_leaves_label_untouched() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);
        let before = *label.disklabel();

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        // Cancels at the rpm prompt.
        let mut dialog = Scripted::new([Answer::Number(1008)]);
        assert!(matches!(
            label.edit_disklabel(&mut ctx, &mut dialog),
            Err(LabelError::Cancelled)
        ));
        assert_eq!(*label.disklabel(), before);
    }

    #[test]
    fn edit_prompts_geometry_on_alpha() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda")
            .with_geometry(GEOM)
            .with_platform(platform::ALPHA);
        let mut dialog = Scripted::new([Answer::YesNo(true)]);
        let mut label = BsdLabel::new();
        label.create(&mut ctx, &mut dialog, &mut NullReport).unwrap();

        let mut dialog = Scripted::new([
            Answer::Number(512),  // bytes/sector
            Answer::Number(32),   // sectors/track
            Answer::Number(8),    // tracks/cylinder
            Answer::Number(512),  // cylinders
            Answer::Number(256),  // sectors/cylinder
            Answer::Number(3600), // rpm
            Answer::Number(1),    // interleave
            Answer::Number(0),    // trackskew
            Answer::Number(0),    // cylinderskew
            Answer::Number(0),    // headswitch
            Answer::Number(0),    // track-to-track seek
        ]);
        label.edit_disklabel(&mut ctx, &mut dialog).unwrap();

        let d = label.disklabel();
        assert_eq!(d.nsectors, 32);
        assert_eq!(d.ntracks, 8);
        assert_eq!(d.ncylinders, 512);
        assert_eq!(d.secperunit, 256 * 512);
    }

    #[test]
    fn list_details_and_table() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        ctx.display_details = true;

        let mut report = Recorder::default();
        label.list(&ctx, &mut report).unwrap();

        assert!(report.infos.iter().any(|l| l == "sectors/cylinder: 1008"));
        assert!(report.infos.iter().any(|l| l == "partitions: 3"));
        assert!(report.infos.iter().any(|l| l.starts_with("Slice")));
        // Row for partition "c", right-aligned numbers.
        let row = report
            .infos
            .iter()
            .find(|l| l.starts_with("c "))
            .expect("row for partition c");
        assert!(row.contains("unused"));
    }

    #[test]
    fn driver_works_through_the_ops_vtable() {
        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut label = created_label(&mut disk);

        let mut io = MemBlockIO::new(&mut disk);
        let mut ctx = DiskContext::new(&mut io, "/dev/sda").with_geometry(GEOM);
        let ops: &mut dyn LabelOps = &mut label;
        ops.write(&mut ctx, &mut NullReport).unwrap();
        assert!(ops.part_is_used(2));
        assert!(!ops.part_is_used(0));
        assert!(ops.probe(&mut ctx, &mut NullReport).unwrap());
        assert!(ops.get_part(&ctx, 2).unwrap().used);
    }

    #[test]
    fn operations_require_a_label() {
        let mut label = BsdLabel::new();
        assert!(label.part_delete(0).is_err());
        assert!(label.part_set_type(0, 0).is_err());
        assert!(!label.part_is_used(2));

        let mut disk = vec![0u8; BSD_BBSIZE];
        let mut io = MemBlockIO::new(&mut disk);
        let ctx = DiskContext::new(&mut io, "/dev/sda");
        assert!(label.get_part(&ctx, 0).is_err());
    }
}
