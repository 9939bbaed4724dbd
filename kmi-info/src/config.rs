// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config: {0:?}")]
    Read(PathBuf, #[source] io::Error),
    #[error("Failed to parse config")]
    Parse(#[source] toml_edit::de::Error),
    #[error("Failed to parse config: {0:?}")]
    ParseFile(PathBuf, #[source] toml_edit::de::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Settings for locating the boot image and the unpacker. Every field is
/// optional in the TOML file.
///
/// ```toml
/// magiskboot = "/data/adb/magisk/magiskboot"
/// block_dev_dir = "/dev/block/by-name"
/// partition = "init_boot"
/// slot_suffix_prop = "ro.boot.slot_suffix"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to an existing `magiskboot` binary.
    pub magiskboot: Option<PathBuf>,
    /// Directory containing the partition block devices.
    pub block_dev_dir: PathBuf,
    /// Partition containing the kernel, without the slot suffix.
    pub partition: String,
    /// System property holding the active slot suffix.
    pub slot_suffix_prop: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            magiskboot: None,
            block_dev_dir: PathBuf::from("/dev/block/by-name"),
            partition: "boot".to_owned(),
            slot_suffix_prop: "ro.boot.slot_suffix".to_owned(),
        }
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        toml_edit::de::from_str(s).map_err(Error::Parse)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| Error::Read(path.to_owned(), e))?;

        toml_edit::de::from_str(&data).map_err(|e| Error::ParseFile(path.to_owned(), e))
    }
}
