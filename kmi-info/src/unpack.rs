// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Wrapper around `magiskboot`, which does the actual boot image unpacking and
//! kernel decompression.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

use thiserror::Error;
use tracing::debug;

use crate::util::{self, DebugString};

/// Decompressed kernel image written by `magiskboot unpack`.
pub const KERNEL_FILE: &str = "kernel";
/// Log output of `magiskboot unpack`.
pub const INFO_FILE: &str = "info";
/// File name of the staged helper binary.
pub const MAGISKBOOT_NAME: &str = "magiskboot";

#[cfg(feature = "embed-magiskboot")]
static EMBEDDED_MAGISKBOOT: &[u8] = include_bytes!(env!("KMI_INFO_MAGISKBOOT"));

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to run command: {0:?}")]
    CommandSpawn(DebugString, #[source] io::Error),
    #[error("Failed to create file: {0:?}")]
    CreateFile(PathBuf, #[source] io::Error),
    #[error("Failed to write file: {0:?}")]
    WriteFile(PathBuf, #[source] io::Error),
    #[error("Failed to remove file: {0:?}")]
    RemoveFile(PathBuf, #[source] io::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Get the `magiskboot` binary that was embedded at build time, if any.
pub fn embedded_magiskboot() -> Option<&'static [u8]> {
    #[cfg(feature = "embed-magiskboot")]
    {
        Some(EMBEDDED_MAGISKBOOT)
    }
    #[cfg(not(feature = "embed-magiskboot"))]
    {
        None
    }
}

/// Write an executable copy of `data` to `<dir>/magiskboot`, replacing any
/// existing file.
pub fn stage_binary(dir: &Path, data: &[u8]) -> Result<PathBuf> {
    let path = dir.join(MAGISKBOOT_NAME);

    util::remove_file_if_exists(&path).map_err(|e| Error::RemoveFile(path.clone(), e))?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }

    let mut file = options
        .open(&path)
        .map_err(|e| Error::CreateFile(path.clone(), e))?;
    file.write_all(data)
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::WriteFile(path.clone(), e))?;

    debug!("Staged magiskboot: {path:?}: {:?}", util::NumBytes(data.len()));

    Ok(path)
}

/// Runs `magiskboot` commands inside a working directory. All output files are
/// written relative to that directory.
#[derive(Clone, Debug)]
pub struct MagiskBoot {
    program: PathBuf,
    work_dir: PathBuf,
}

impl MagiskBoot {
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn kernel_path(&self) -> PathBuf {
        self.work_dir.join(KERNEL_FILE)
    }

    pub fn info_path(&self) -> PathBuf {
        self.work_dir.join(INFO_FILE)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.current_dir(&self.work_dir);
        command.stdin(Stdio::null());
        command
    }

    fn run(mut command: Command) -> Result<ExitStatus> {
        debug!("Running: {command:?}");

        let status = command
            .status()
            .map_err(|e| Error::CommandSpawn(DebugString::new(&command), e))?;

        if !status.success() {
            debug!("Command failed with status: {status}: {command:?}");
        }

        Ok(status)
    }

    /// Remove output files left over from a previous run so that a failed
    /// unpack can't be mistaken for a successful one.
    pub fn remove_outputs(&self) -> Result<()> {
        for path in [self.kernel_path(), self.info_path()] {
            util::remove_file_if_exists(&path).map_err(|e| Error::RemoveFile(path, e))?;
        }

        Ok(())
    }

    /// Unpack `image`. Both stdout and stderr are written to [`INFO_FILE`]. A
    /// non-zero exit status is not treated as an error. Callers should check
    /// whether [`KERNEL_FILE`] exists instead.
    pub fn unpack(&self, image: &Path) -> Result<ExitStatus> {
        let info_path = self.info_path();
        let stdout =
            File::create(&info_path).map_err(|e| Error::CreateFile(info_path.clone(), e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| Error::CreateFile(info_path.clone(), e))?;

        let mut command = self.command();
        command.arg("unpack");
        command.arg(image);
        command.stdout(stdout);
        command.stderr(stderr);

        Self::run(command)
    }

    /// Decompress [`KERNEL_FILE`] in place. This is a no-op for kernels that
    /// are not compressed.
    pub fn decompress_kernel(&self) -> Result<ExitStatus> {
        let mut command = self.command();
        command.arg("decompress");
        command.arg(KERNEL_FILE);
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());

        Self::run(command)
    }

    /// Remove all files that `unpack` created in the working directory.
    pub fn cleanup(&self) -> Result<ExitStatus> {
        let mut command = self.command();
        command.arg("cleanup");
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());

        Self::run(command)
    }
}
