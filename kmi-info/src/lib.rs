// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! kmi-info is primarily an application. The semver versioning covers the CLI
//! and the printed KMI line only. All Rust APIs can change at any time, even in
//! patch releases.
//!
//! The extraction logic in [`format`] only reads the two files it is pointed
//! at and only fails when cancelled. Everything that runs external programs or
//! reads device state lives in [`unpack`] and [`device`].

pub mod cli;
pub mod config;
pub mod device;
pub mod format;
pub mod stream;
pub mod unpack;
pub mod util;
