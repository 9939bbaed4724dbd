// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Lookup of the active boot partition on a running Android device.

use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

use thiserror::Error;
use tracing::debug;

use crate::util::DebugString;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to run command: {0:?}")]
    CommandSpawn(DebugString, #[source] io::Error),
    #[error("Command failed with status: {1}: {0:?}")]
    CommandExecution(DebugString, ExitStatus),
}

type Result<T> = std::result::Result<T, Error>;

/// Parse the output of `getprop`. Only the first line is used and surrounding
/// whitespace is removed.
fn parse_prop_output(output: &[u8]) -> String {
    let output = String::from_utf8_lossy(output);
    output.lines().next().unwrap_or_default().trim().to_owned()
}

/// Get the value of an Android system property with `getprop`. Unset
/// properties are returned as an empty string, same as `getprop` itself.
pub fn get_prop(name: &str) -> Result<String> {
    let mut command = Command::new("getprop");
    command.arg(name);
    command.stdin(Stdio::null());
    command.stderr(Stdio::null());

    let output = command
        .output()
        .map_err(|e| Error::CommandSpawn(DebugString::new(&command), e))?;

    if !output.status.success() {
        return Err(Error::CommandExecution(
            DebugString::new(&command),
            output.status,
        ));
    }

    Ok(parse_prop_output(&output.stdout))
}

/// Get the A/B slot suffix (eg. `_a`) from the property `prop`. Devices
/// without A/B partitions, or systems without `getprop`, have no suffix.
pub fn slot_suffix(prop: &str) -> String {
    match get_prop(prop) {
        Ok(suffix) => {
            debug!("Slot suffix: {suffix:?}");
            suffix
        }
        Err(e) => {
            debug!("Assuming no slot suffix: {e}");
            String::new()
        }
    }
}

/// Get the path to the block device for `partition` in the slot `suffix`.
pub fn partition_path(block_dev_dir: &Path, partition: &str, suffix: &str) -> PathBuf {
    block_dev_dir.join(format!("{partition}{suffix}"))
}
