// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Helpers for the log that `magiskboot unpack` prints. Lines look like:
//!
//! ```text
//! HEADER_VER      [4]
//! KERNEL_SZ       [20185096]
//! OS_PATCH_LEVEL  [2023-05]
//! KERNEL_FMT      [lz4_legacy]
//! ```

use std::{fs, io, path::Path};

use bstr::{BStr, ByteSlice};
use tracing::{debug, warn};

pub const OS_PATCH_LEVEL: &str = "OS_PATCH_LEVEL";
pub const KERNEL_FMT: &str = "KERNEL_FMT";

/// Find the first line in `text` that contains `marker`. The line terminator
/// is not included.
pub fn find_line<'a>(text: &'a [u8], marker: &str) -> Option<&'a BStr> {
    text.lines()
        .find(|line| line.contains_str(marker))
        .map(|line| line.as_bstr())
}

/// Get the value between the first `[` and the next `]` after it.
pub fn extract_bracketed(line: &[u8]) -> Option<&BStr> {
    let start = line.find_byte(b'[')? + 1;
    let len = line[start..].find_byte(b']')?;

    Some(line[start..start + len].as_bstr())
}

/// Log output from unpacking a boot image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoLog {
    data: Vec<u8>,
}

impl InfoLog {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Load the log from a file. A missing or unreadable file results in an
    /// empty log, where every lookup returns [`None`].
    pub fn from_file(path: &Path) -> Self {
        match fs::read(path) {
            Ok(data) => Self::new(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Unpack log does not exist: {path:?}");
                Self::default()
            }
            Err(e) => {
                warn!("Failed to read unpack log: {path:?}: {e}");
                Self::default()
            }
        }
    }

    /// Get the bracketed value from the first line containing `marker`.
    /// Non-UTF-8 data is replaced lossily.
    pub fn field(&self, marker: &str) -> Option<String> {
        let line = find_line(&self.data, marker)?;
        debug!("{marker} line: {line:?}");

        let value = extract_bracketed(line)?;
        debug!("{marker} value: {value:?}");

        Some(value.to_str_lossy().into_owned())
    }

    /// The security patch level, eg. `2023-05-01`.
    pub fn os_patch_level(&self) -> Option<String> {
        self.field(OS_PATCH_LEVEL)
    }

    /// The raw kernel compression format name, eg. `gzip`.
    pub fn kernel_format(&self) -> Option<String> {
        self.field(KERNEL_FMT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &[u8] = b"Parsing boot image: [/dev/block/by-name/boot_a]\n\
        HEADER_VER      [4]\n\
        KERNEL_SZ       [20185096]\n\
        RAMDISK_SZ      [0]\n\
        OS_VERSION      [13.0.0]\n\
        OS_PATCH_LEVEL  [2023-05]\n\
        PAGESIZE        [4096]\n\
        CMDLINE         []\n\
        KERNEL_FMT      [lz4_legacy]\n\
        VBMETA\n";

    #[test]
    fn bracketed_value() {
        assert_eq!(extract_bracketed(b"KERNEL_FMT      [gzip]"), Some(b"gzip".as_bstr()));
        assert_eq!(extract_bracketed(b"CMDLINE         []"), Some(b"".as_bstr()));
        assert_eq!(extract_bracketed(b"A [b] [c]"), Some(b"b".as_bstr()));
        assert_eq!(extract_bracketed(b"A [b [c]"), Some(b"b [c".as_bstr()));
    }

    #[test]
    fn bracketed_value_malformed() {
        assert_eq!(extract_bracketed(b"KERNEL_FMT      gzip"), None);
        assert_eq!(extract_bracketed(b"KERNEL_FMT      [gzip"), None);
        assert_eq!(extract_bracketed(b"KERNEL_FMT      ]gzip["), None);
        assert_eq!(extract_bracketed(b""), None);
    }

    #[test]
    fn first_matching_line() {
        assert_eq!(
            find_line(LOG, "OS_PATCH_LEVEL"),
            Some(b"OS_PATCH_LEVEL  [2023-05]".as_bstr()),
        );
        // Substring match, not a key match.
        assert_eq!(
            find_line(LOG, "boot image"),
            Some(b"Parsing boot image: [/dev/block/by-name/boot_a]".as_bstr()),
        );
        assert_eq!(find_line(LOG, "DTB_SZ"), None);
        assert_eq!(find_line(b"", "KERNEL_FMT"), None);
    }

    #[test]
    fn crlf_lines() {
        let log = b"KERNEL_FMT      [gzip]\r\nOS_PATCH_LEVEL  [2021-01]\r\n";
        assert_eq!(
            find_line(log, "KERNEL_FMT"),
            Some(b"KERNEL_FMT      [gzip]".as_bstr()),
        );
    }

    #[test]
    fn fields() {
        let log = InfoLog::new(LOG);
        assert_eq!(log.os_patch_level().as_deref(), Some("2023-05"));
        assert_eq!(log.kernel_format().as_deref(), Some("lz4_legacy"));
        assert_eq!(log.field("CMDLINE").as_deref(), Some(""));
        assert_eq!(log.field("VBMETA"), None);
        assert_eq!(log.field("MISSING"), None);

        // Lookups do not depend on each other.
        assert_eq!(log.os_patch_level(), log.os_patch_level());
    }

    #[test]
    fn missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log = InfoLog::from_file(&temp_dir.path().join("info"));

        assert_eq!(log, InfoLog::default());
        assert_eq!(log.os_patch_level(), None);
        assert_eq!(log.kernel_format(), None);
    }

    #[test]
    fn from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("info");
        fs::write(&path, LOG).unwrap();

        assert_eq!(InfoLog::from_file(&path), InfoLog::new(LOG));
    }
}
