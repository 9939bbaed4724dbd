// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{fs, io::Cursor, path::Path, sync::atomic::AtomicBool};

use assert_matches::assert_matches;
use kmi_info::format::{
    banner::BannerScanner,
    info::{self, InfoLog},
    kmi::{CompressionTag, Kmi},
    version::KernelVersion,
};

const GKI_BANNER: &[u8] = b"Linux version 5.10.101-android13-8-something (build@host) \
    (Android clang version 14.0.6) #1 SMP PREEMPT Thu Jan 1 00:00:00 UTC 2023";

const INFO_LOG: &str = "Parsing boot image: [boot.img]\n\
    HEADER_VER      [4]\n\
    KERNEL_SZ       [20185096]\n\
    RAMDISK_SZ      [0]\n\
    OS_VERSION      [13.0.0]\n\
    OS_PATCH_LEVEL  [2023-05-01]\n\
    PAGESIZE        [4096]\n\
    CMDLINE         []\n\
    KERNEL_FMT      [lz4]\n";

/// Build a fake kernel image with some binary data around the banner.
fn kernel_image(banners: &[&[u8]]) -> Vec<u8> {
    let mut data = b"\x7fELF\x02\x01\x01\x00".to_vec();
    data.extend((0..=255u8).cycle().take(100_000));

    for banner in banners {
        data.extend_from_slice(banner);
        data.extend_from_slice(b"\n\x00");
        data.extend((0..=255u8).rev().cycle().take(70_001));
    }

    data
}

fn write_files(dir: &Path, kernel: &[u8], info: &str) {
    fs::write(dir.join("kernel"), kernel).unwrap();
    fs::write(dir.join("info"), info).unwrap();
}

fn compute(dir: &Path) -> Kmi {
    let cancel_signal = AtomicBool::new(false);
    Kmi::from_files(&dir.join("kernel"), &dir.join("info"), &cancel_signal).unwrap()
}

#[test]
fn banner_absent() {
    let cancel_signal = AtomicBool::new(false);
    let data = kernel_image(&[b"Linux versio", b"linux version 5.10"]);

    let banner = BannerScanner::new()
        .scan(Cursor::new(&data), &cancel_signal)
        .unwrap();
    assert_eq!(banner, None);
}

#[test]
fn strong_banner_after_shorter_one() {
    let cancel_signal = AtomicBool::new(false);
    let data = kernel_image(&[b"Linux version 5.10", GKI_BANNER]);

    let banner = BannerScanner::new()
        .scan(Cursor::new(&data), &cancel_signal)
        .unwrap()
        .unwrap();
    assert_eq!(banner.as_str().as_bytes(), GKI_BANNER);
    assert!(banner.is_strong_match());
}

#[test]
fn banner_straddling_default_chunk() {
    let cancel_signal = AtomicBool::new(false);
    let mut data = vec![0u8; 64 * 1024 - 7];
    data.extend_from_slice(GKI_BANNER);

    let banner = BannerScanner::new()
        .scan(Cursor::new(&data), &cancel_signal)
        .unwrap()
        .unwrap();
    assert_eq!(banner.as_str().as_bytes(), GKI_BANNER);
}

#[test]
fn parse_versions() {
    assert_eq!(
        KernelVersion::from_banner("Linux version 5.10.101-android13-8-g1234567")
            .unwrap()
            .to_string(),
        "android13-5.10.101",
    );
    assert_eq!(
        KernelVersion::from_banner("Linux version 4.9.186-perf+ (build@host) ...")
            .unwrap()
            .to_string(),
        "4.9.186",
    );
    assert_eq!(KernelVersion::from_banner(""), None);
}

#[test]
fn bracketed() {
    assert_eq!(
        info::extract_bracketed(b"KERNEL_FMT      [gzip]").map(|v| v.to_vec()),
        Some(b"gzip".to_vec()),
    );
    assert_eq!(info::extract_bracketed(b"KERNEL_FMT      gzip"), None);
}

#[test]
fn info_lookups_are_repeatable() {
    let log = InfoLog::new(INFO_LOG);

    for _ in 0..3 {
        assert_eq!(log.os_patch_level().as_deref(), Some("2023-05-01"));
        assert_eq!(log.kernel_format().as_deref(), Some("lz4"));
    }
}

#[test]
fn gki_kernel() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(temp_dir.path(), &kernel_image(&[GKI_BANNER]), INFO_LOG);

    let kmi = compute(temp_dir.path());
    assert_matches!(kmi.kernel_version, Some(KernelVersion::Gki { .. }));
    assert_eq!(kmi.to_string(), "android13-5.10.101_2023-05-01-boot-lz4");
}

#[test]
fn legacy_kernel() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kernel = kernel_image(&[
        b"Linux version 4.9.186",
        b"Linux version 4.9.186-perf+ (build@host) (gcc version 4.9.x 20150123) #1",
    ]);
    let info = INFO_LOG
        .replace("[2023-05-01]", "[2020-01-05]")
        .replace("[lz4]", "[gzip]");
    write_files(temp_dir.path(), &kernel, &info);

    let kmi = compute(temp_dir.path());
    assert_eq!(kmi.to_string(), "4.9.186_2020-01-05-boot-gz");
}

#[test]
fn raw_kernel() {
    let temp_dir = tempfile::tempdir().unwrap();
    let info = INFO_LOG.replace("[lz4]", "[raw]");
    write_files(temp_dir.path(), &kernel_image(&[GKI_BANNER]), &info);

    let kmi = compute(temp_dir.path());
    assert_eq!(kmi.compression, CompressionTag::None);
    assert!(kmi.to_string().ends_with("-boot"));
}

#[test]
fn unsupported_compression() {
    let temp_dir = tempfile::tempdir().unwrap();
    let info = INFO_LOG.replace("[lz4]", "[lz4_legacy]");
    write_files(temp_dir.path(), &kernel_image(&[GKI_BANNER]), &info);

    let kmi = compute(temp_dir.path());
    assert!(!kmi.compression.is_well_supported());
    assert_eq!(kmi.to_string(), "android13-5.10.101_2023-05-01-boot-lz4_legacy");
}

#[test]
fn missing_files() {
    let temp_dir = tempfile::tempdir().unwrap();

    let kmi = compute(temp_dir.path());
    assert_eq!(kmi.to_string(), "unknown_unknown-boot");
}

#[test]
fn missing_fields() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_files(
        temp_dir.path(),
        &kernel_image(&[]),
        "OS_PATCH_LEVEL\nKERNEL_FMT      [\n",
    );

    let kmi = compute(temp_dir.path());
    assert_eq!(kmi, Kmi::new(None, None, None));
    assert_eq!(kmi.to_string(), "unknown_unknown-boot");
}
