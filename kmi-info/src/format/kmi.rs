// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, io, path::Path, sync::atomic::AtomicBool};

use phf::phf_map;
use tracing::debug;

use crate::format::{banner::BannerScanner, info::InfoLog, version::KernelVersion};

/// Placeholder for fields that could not be determined.
pub const UNKNOWN: &str = "unknown";

static COMPRESSION_TAGS: phf::Map<&'static str, &'static str> = phf_map! {
    "raw" => "",
    "gzip" => "-gz",
    "lz4" => "-lz4",
};

/// KMI suffix describing the kernel compression format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompressionTag {
    /// Uncompressed or unknown. No suffix.
    None,
    /// A format that downstream packaging handles.
    Known(&'static str),
    /// Any other format. The suffix is the format name itself.
    Other(String),
}

impl CompressionTag {
    /// Map a raw format name, as reported by the unpacker, to a tag. Names are
    /// matched exactly and are case-sensitive.
    pub fn from_format(format: Option<&str>) -> Self {
        match format {
            None | Some("") => Self::None,
            Some(f) => match COMPRESSION_TAGS.get(f) {
                Some(&"") => Self::None,
                Some(tag) => Self::Known(*tag),
                None => Self::Other(
                    f.chars()
                        .map(|c| if c.is_whitespace() { '_' } else { c })
                        .collect(),
                ),
            },
        }
    }

    /// Whether the format is one that kernel module packaging tools are known
    /// to handle.
    pub fn is_well_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Name of an unsupported format.
    pub fn unsupported_format(&self) -> Option<&str> {
        match self {
            Self::Other(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Display for CompressionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Known(tag) => f.write_str(tag),
            Self::Other(name) => write!(f, "-{name}"),
        }
    }
}

/// Kernel module interface identifier. The [`fmt::Display`] output has the
/// form `<kernel version>_<security patch>-boot<compression tag>`, eg.
/// `android13-5.10.101_2023-05-01-boot-lz4`. Missing fields are displayed as
/// [`UNKNOWN`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Kmi {
    pub kernel_version: Option<KernelVersion>,
    pub security_patch: Option<String>,
    pub compression: CompressionTag,
}

impl Kmi {
    pub fn new(
        kernel_version: Option<KernelVersion>,
        security_patch: Option<&str>,
        format: Option<&str>,
    ) -> Self {
        Self {
            kernel_version,
            security_patch: security_patch.filter(|p| !p.is_empty()).map(ToOwned::to_owned),
            compression: CompressionTag::from_format(format),
        }
    }

    /// Compute the KMI from the kernel image and unpack log written by the
    /// unpacker. Missing or unreadable files only result in unknown fields. An
    /// error is only returned if the operation was cancelled.
    pub fn from_files(
        kernel: &Path,
        info: &Path,
        cancel_signal: &AtomicBool,
    ) -> io::Result<Self> {
        let banner = BannerScanner::new().scan_file(kernel, cancel_signal)?;
        let kernel_version = banner
            .as_ref()
            .and_then(|b| KernelVersion::from_banner(b.as_str()));
        debug!("Kernel version: {kernel_version:?}");

        let log = InfoLog::from_file(info);
        let security_patch = log.os_patch_level();
        let format = log.kernel_format();
        debug!("Security patch: {security_patch:?}");
        debug!("Compression format: {format:?}");

        Ok(Self::new(
            kernel_version,
            security_patch.as_deref(),
            format.as_deref(),
        ))
    }
}

impl fmt::Display for Kmi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kernel_version {
            Some(v) => write!(f, "{v}")?,
            None => f.write_str(UNKNOWN)?,
        }

        write!(
            f,
            "_{}-boot{}",
            self.security_patch.as_deref().unwrap_or(UNKNOWN),
            self.compression,
        )
    }
}
