// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

pub mod banner;
pub mod info;
pub mod kmi;
pub mod version;
