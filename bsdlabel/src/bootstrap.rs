// SPDX-License-Identifier: MIT

//! Bootstrap installation: composing the two boot stages into the boot
//! block without losing the disklabel embedded in the same byte range.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::bootblock::alpha_bootblock_checksum;
use crate::context::DiskContext;
use crate::dialog::{Dialog, Report};
use crate::disklabel::BSD_BBSIZE;
use crate::errors::{LabelError, LabelResult};
use crate::fstype::BSD_DTYPE_SCSI;
use crate::label::BsdLabel;

/// Where the bootstrap images live unless told otherwise.
pub const BSD_LINUX_BOOTDIR: &str = "/usr/ucb/mdec";

/// Directory holding the `<name>boot` / `boot<name>` image pairs.
#[derive(Clone, Debug)]
pub struct BootstrapSource {
    dir: PathBuf,
}

impl BootstrapSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for BootstrapSource {
    fn default() -> Self {
        Self::new(BSD_LINUX_BOOTDIR)
    }
}

fn load_exact(
    path: &Path,
    len: usize,
    dev: &str,
    report: &mut dyn Report,
) -> LabelResult<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| {
        report.warn(dev, &format!("cannot open {}", path.display()));
        LabelError::from(e)
    })?;

    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf).map_err(|e| {
        report.warn(dev, &format!("cannot read {}", path.display()));
        LabelError::from(e)
    })?;

    report.success(
        dev,
        &format!("The bootstrap file {} successfully loaded.", path.display()),
    );
    Ok(buf)
}

impl BsdLabel {
    /// Installs the two-stage bootstrap into the boot block and writes it
    /// out.
    ///
    /// The second stage covers the byte range holding the embedded
    /// disklabel, so the label bytes are saved, zeroed, and only restored
    /// after checking that the second stage really left the region blank;
    /// anything else is an [`LabelError::Overlap`] and the device is left
    /// untouched.
    pub fn write_bootstrap(
        &mut self,
        ctx: &mut DiskContext<'_>,
        dialog: &mut dyn Dialog,
        report: &mut dyn Report,
        source: &BootstrapSource,
    ) -> LabelResult {
        self.require_label()?;

        let d = *self.disklabel();
        let default_name = if d.dtype == BSD_DTYPE_SCSI { "sd" } else { "wd" };
        let answer = dialog.ask_string(&format!(
            "Bootstrap: {default_name}boot -> boot{default_name} (default {default_name})"
        ))?;
        let name = if answer.is_empty() {
            default_name
        } else {
            answer.as_str()
        };

        let secsize = d.secsize as usize;
        let bbsize = d.bbsize as usize;
        if secsize == 0 || bbsize > BSD_BBSIZE || secsize >= bbsize {
            return Err(LabelError::Corrupt("implausible sector or boot-block size"));
        }
        let region = ctx.platform.label_region();

        let first = load_exact(
            &self.boot_path(source, &format!("{name}boot")),
            secsize,
            &ctx.dev_path,
            report,
        )?;

        let saved;
        {
            let buf = self.boot_block_mut().bytes_mut();
            buf[..secsize].copy_from_slice(&first);

            // The disklabel will be overwritten by 0's from the second
            // stage anyway; keep a copy to put back.
            saved = buf[region.clone()].to_vec();
            buf[region.clone()].fill(0);
        }

        let second = load_exact(
            &self.boot_path(source, &format!("boot{name}")),
            bbsize - secsize,
            &ctx.dev_path,
            report,
        )?;

        let buf = self.boot_block_mut().bytes_mut();
        buf[secsize..bbsize].copy_from_slice(&second);

        // Check the end of the bootstrap against the label region.
        if buf[region.clone()].iter().any(|&b| b != 0) {
            report.warn(&ctx.dev_path, "Bootstrap overlaps with disklabel!");
            return Err(LabelError::Overlap);
        }

        buf[region].copy_from_slice(&saved);

        if ctx.platform.boot_checksum {
            alpha_bootblock_checksum(buf);
        }

        let base = self.base_offset(ctx);
        self.boot_block().write_to(ctx.io, base)?;

        report.success(
            &ctx.dev_path,
            &format!("Bootstrap installed on {}.", ctx.dev_path),
        );
        report.info(&ctx.dev_path, "Syncing disks.");
        Ok(())
    }

    fn boot_path(&self, source: &BootstrapSource, file: &str) -> PathBuf {
        source.dir().join(file)
    }
}
