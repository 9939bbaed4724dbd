// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, sync::LazyLock};

use regex::Regex;
use tracing::debug;

// We compile without Unicode support so we have to use [0-9] instead of \d.
static GKI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Linux version ([0-9.]+)-([^-[:space:]]+)").unwrap()
});

/// Kernel version as used in KMI strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelVersion {
    /// Generic Kernel Image. The KMI key is `<android>-<version>`, eg.
    /// `android13-5.10.101`.
    Gki { android: String, version: String },
    /// Legacy kernel where only the dotted version is relevant, eg. `4.9.186`.
    Legacy(String),
}

impl KernelVersion {
    /// Whether a banner should be parsed as a GKI banner.
    ///
    /// This matches `android` anywhere in the banner, so vendor kernels with
    /// eg. `android-build` in the builder's hostname are also treated as GKI
    /// candidates. Those fall back to the legacy parser because their version
    /// suffix doesn't start with `android`.
    pub fn looks_like_gki(banner: &str) -> bool {
        banner.contains("android")
    }

    /// Parse the version from a `Linux version ...` banner. Returns [`None`]
    /// if no version could be found.
    pub fn from_banner(banner: &str) -> Option<Self> {
        if banner.is_empty() {
            return None;
        }

        if Self::looks_like_gki(banner) {
            if let Some(version) = Self::parse_gki(banner) {
                return Some(version);
            }

            debug!("GKI pattern did not match, falling back to legacy parsing");
        }

        Self::parse_legacy(banner)
    }

    fn parse_gki(banner: &str) -> Option<Self> {
        let captures = GKI_REGEX.captures(banner)?;
        let version = &captures[1];
        let android = &captures[2];

        if !android.starts_with("android") {
            return None;
        }

        Some(Self::Gki {
            android: android.to_owned(),
            version: version.to_owned(),
        })
    }

    /// Take the third whitespace-separated token, which is the kernel release,
    /// and strip everything from the first `-` onwards.
    fn parse_legacy(banner: &str) -> Option<Self> {
        let release = banner.split_whitespace().nth(2)?;
        let version = release.split('-').next().unwrap_or(release);

        if version.is_empty() {
            return None;
        }

        Some(Self::Legacy(version.to_owned()))
    }

    pub fn is_gki(&self) -> bool {
        matches!(self, Self::Gki { .. })
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gki { android, version } => write!(f, "{android}-{version}"),
            Self::Legacy(version) => f.write_str(version),
        }
    }
}
