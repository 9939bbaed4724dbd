// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    path::{self, Path, PathBuf},
    sync::atomic::AtomicBool,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};

use crate::{
    cli::compute::{self, OutputGroup},
    config::Config,
    device,
    format::kmi::Kmi,
    stream,
    unpack::{self, MagiskBoot},
    util::{self, NumBytes},
};

/// Paths containing a directory component are made absolute because the
/// unpacker runs with the work directory as its current directory. Bare
/// program names are left alone so that they are looked up in `PATH`.
fn resolve_program(path: &Path) -> Result<PathBuf> {
    if path.components().count() > 1 {
        path::absolute(path).with_context(|| format!("Failed to get absolute path: {path:?}"))
    } else {
        Ok(path.to_owned())
    }
}

fn boot_image_path(cli: &DetectCli, config: &Config) -> Result<PathBuf> {
    let path = match &cli.image {
        Some(p) => p.clone(),
        None => {
            let suffix = device::slot_suffix(&config.slot_suffix_prop);
            device::partition_path(&config.block_dev_dir, &config.partition, &suffix)
        }
    };

    path::absolute(&path).with_context(|| format!("Failed to get absolute path: {path:?}"))
}

fn unpack_and_compute(
    magiskboot: &MagiskBoot,
    image: &Path,
    cancel_signal: &AtomicBool,
) -> Result<Kmi> {
    magiskboot.remove_outputs()?;

    stream::check_cancel(cancel_signal)?;

    info!("Unpacking boot image: {image:?}");
    let status = magiskboot.unpack(image)?;
    if !status.success() {
        warn!("magiskboot unpack failed with status: {status}");
    }

    let kernel_path = magiskboot.kernel_path();
    let Some(size) = util::non_empty_file_size(&kernel_path) else {
        bail!("Invalid boot image: {image:?}");
    };
    debug!("Kernel image: {kernel_path:?}: {:?}", NumBytes(size));

    stream::check_cancel(cancel_signal)?;

    // Fails for kernels that aren't compressed.
    let status = magiskboot.decompress_kernel()?;
    if !status.success() {
        debug!("Kernel decompression failed with status: {status}");
    }

    let kmi = Kmi::from_files(&kernel_path, &magiskboot.info_path(), cancel_signal)
        .with_context(|| format!("Failed to compute KMI: {kernel_path:?}"))?;

    Ok(kmi)
}

/// Remove unpacked files. Failures are only logged since the KMI may already
/// have been computed.
fn cleanup(magiskboot: &MagiskBoot, staged: Option<&Path>) {
    match magiskboot.cleanup() {
        Ok(status) if !status.success() => {
            debug!("magiskboot cleanup failed with status: {status}");
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to clean up work directory: {e}"),
    }

    let info_path = magiskboot.info_path();

    for path in [Some(info_path.as_path()), staged].into_iter().flatten() {
        if let Err(e) = util::remove_file_if_exists(path) {
            warn!("Failed to remove file: {path:?}: {e}");
        }
    }
}

pub fn detect_main(cli: &DetectCli, cancel_signal: &AtomicBool) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let image = boot_image_path(cli, &config)?;

    let (temp_dir, work_dir) = match &cli.work_dir {
        Some(dir) => {
            let path = path::absolute(dir)
                .with_context(|| format!("Failed to get absolute path: {dir:?}"))?;
            (None, path)
        }
        None => {
            let dir = tempfile::Builder::new()
                .prefix("kmi-info-")
                .tempdir()
                .context("Failed to create temporary directory")?;
            let path = dir.path().to_owned();
            (Some(dir), path)
        }
    };
    debug!("Work directory: {work_dir:?}");

    let mut staged = None;
    let program = match cli.magiskboot.as_ref().or(config.magiskboot.as_ref()) {
        Some(path) => resolve_program(path)?,
        None => match unpack::embedded_magiskboot() {
            Some(data) => {
                let path = unpack::stage_binary(&work_dir, data)?;
                staged = Some(path.clone());
                path
            }
            None => PathBuf::from(unpack::MAGISKBOOT_NAME),
        },
    };

    let magiskboot = MagiskBoot::new(program, &work_dir);
    let result = unpack_and_compute(&magiskboot, &image, cancel_signal);

    if cli.keep_work_dir {
        info!("Keeping unpacked files: {work_dir:?}");
    } else {
        cleanup(&magiskboot, staged.as_deref());
    }

    drop(temp_dir);

    let kmi = result?;
    compute::print_kmi(&kmi, &cli.output);

    Ok(())
}

/// Unpack a boot image and print its KMI.
///
/// magiskboot is used to unpack the image and decompress the kernel. It is
/// looked up in this order: the --magiskboot option, the config file, the copy
/// embedded at build time, and finally `PATH`.
#[derive(Debug, Parser)]
pub struct DetectCli {
    /// Path to boot image or block device.
    ///
    /// Defaults to the boot partition of the active slot.
    #[arg(value_name = "IMAGE", value_parser)]
    pub image: Option<PathBuf>,

    /// Path to magiskboot binary.
    #[arg(long, value_name = "FILE", value_parser)]
    pub magiskboot: Option<PathBuf>,

    /// Directory to unpack the boot image into.
    ///
    /// Defaults to a temporary directory.
    #[arg(long, value_name = "DIRECTORY", value_parser)]
    pub work_dir: Option<PathBuf>,

    /// Keep the unpacked files in the work directory.
    #[arg(long, requires = "work_dir")]
    pub keep_work_dir: bool,

    /// Path to config file.
    #[arg(short, long, value_name = "FILE", value_parser)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputGroup,
}
