// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

#[cfg(not(windows))]
mod fuzz {
    use honggfuzz::fuzz;
    use kmi_info::format::{info::InfoLog, kmi::Kmi, version::KernelVersion};

    pub fn main() {
        loop {
            fuzz!(|data: &[u8]| {
                let banner = String::from_utf8_lossy(data);
                let version = KernelVersion::from_banner(&banner);

                let log = InfoLog::new(data);
                let patch = log.os_patch_level();
                let format = log.kernel_format();

                let _ = Kmi::new(version, patch.as_deref(), format.as_deref()).to_string();
            });
        }
    }
}

fn main() {
    #[cfg(not(windows))]
    fuzz::main();
}
