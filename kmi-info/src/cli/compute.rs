// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{path::PathBuf, sync::atomic::AtomicBool};

use anyhow::{Context, Result};
use clap::{Args, Parser};

use crate::{cli::warning, format::kmi::Kmi};

#[derive(Debug, Args)]
pub struct OutputGroup {
    /// Print only the KMI string without the `KMI: ` prefix.
    #[arg(long)]
    pub raw: bool,
}

/// Print the KMI line, preceded by a warning if the kernel compression format
/// is not handled well by kernel module packaging tools.
pub fn print_kmi(kmi: &Kmi, output: &OutputGroup) {
    if let Some(format) = kmi.compression.unsupported_format() {
        warning!("kernel compression format is {format}, please use AnyKernel3.zip");
    }

    if output.raw {
        println!("{kmi}");
    } else {
        println!("KMI: {kmi}");
    }
}

pub fn compute_main(cli: &ComputeCli, cancel_signal: &AtomicBool) -> Result<()> {
    let kmi = Kmi::from_files(&cli.kernel, &cli.info, cancel_signal)
        .with_context(|| format!("Failed to compute KMI: {:?}", cli.kernel))?;

    print_kmi(&kmi, &cli.output);

    Ok(())
}

/// Compute the KMI from an already unpacked boot image.
///
/// The kernel must already be decompressed. Missing files are not an error and
/// only cause the corresponding fields to be reported as unknown.
#[derive(Debug, Parser)]
pub struct ComputeCli {
    /// Path to decompressed kernel image.
    #[arg(short, long, value_name = "FILE", value_parser, default_value = "kernel")]
    pub kernel: PathBuf,

    /// Path to magiskboot unpack log.
    #[arg(short, long, value_name = "FILE", value_parser, default_value = "info")]
    pub info: PathBuf,

    #[command(flatten)]
    pub output: OutputGroup,
}
