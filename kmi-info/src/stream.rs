// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    io::{self, Read},
    sync::atomic::{AtomicBool, Ordering},
};

/// Return an [`io::ErrorKind::Interrupted`] error if `cancel_signal` is true.
/// This should be called frequently in I/O loops for cancellation to be
/// responsive.
#[inline]
pub fn check_cancel(cancel_signal: &AtomicBool) -> io::Result<()> {
    if cancel_signal.load(Ordering::SeqCst) {
        return Err(io::Error::new(
            io::ErrorKind::Interrupted,
            "Received cancel signal",
        ));
    }

    Ok(())
}

/// Read `reader` in chunks of at most `buf.len()` bytes, invoking `inspect` for
/// each chunk. Reading stops at EOF or when `inspect` returns `Some`, in which
/// case that value is returned. The operation is cancelled on the next loop
/// iteration if `cancel_signal` is set to `true`.
pub fn read_chunks<R: Read, T>(
    mut reader: R,
    buf: &mut [u8],
    mut inspect: impl FnMut(&[u8]) -> Option<T>,
    cancel_signal: &AtomicBool,
) -> io::Result<Option<T>> {
    loop {
        check_cancel(cancel_signal)?;

        let n = match reader.read(buf) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        if let Some(value) = inspect(&buf[..n]) {
            return Ok(Some(value));
        }
    }
}
