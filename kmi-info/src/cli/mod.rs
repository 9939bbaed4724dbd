// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

pub mod args;
pub mod compute;
pub mod detect;

/// Print a warning to stdout, next to the KMI line. Colors are only used when
/// stdout is a terminal so that piped output stays parseable.
macro_rules! warning {
    ($($arg:tt)*) => {{
        use std::io::IsTerminal;

        let message = format!($($arg)*);
        if std::io::stdout().is_terminal() {
            println!("\x1b[1;31mWarning: {message}\x1b[0m");
        } else {
            println!("Warning: {message}");
        }
    }};
}

pub(crate) use warning;
