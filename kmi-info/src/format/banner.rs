// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Scanner for the `Linux version ...` banner that every kernel image embeds
//! verbatim. The banner is usually surrounded by binary data and may be
//! interrupted by stray non-printable bytes, so the scanner works directly on
//! raw bytes instead of decoding the image.

use std::{
    collections::VecDeque,
    fmt,
    fs::File,
    io::{self, Read},
    path::Path,
    sync::atomic::AtomicBool,
};

use memchr::memchr;
use tracing::{debug, trace, warn};

use crate::stream;

pub const PREFIX: &[u8; 14] = b"Linux version ";

/// Maximum number of bytes kept for a single banner, including the prefix.
pub const MAX_LEN: usize = 1023;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Whether a byte is copied into a banner. Line breaks are handled separately
/// since they terminate the banner.
#[inline]
fn is_banner_byte(b: u8) -> bool {
    b.is_ascii_graphic() || matches!(b, b' ' | b'\t' | b'\x0b' | b'\x0c')
}

/// A `Linux version ...` string extracted from a kernel image. It only ever
/// contains printable ASCII characters and non-line-break whitespace.
#[derive(Clone, PartialEq, Eq)]
pub struct Banner(String);

impl Banner {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the banner is almost certainly the real one and not some other
    /// string that happens to start with the prefix. Full kernel banners list
    /// the build flags, which for Android kernels always include `SMP` and
    /// `PREEMPT`.
    pub fn is_strong_match(&self) -> bool {
        let mut smp = false;
        let mut preempt = false;

        for token in self.0.split_ascii_whitespace() {
            match token {
                "SMP" => smp = true,
                "PREEMPT" => preempt = true,
                _ => {}
            }
        }

        smp && preempt
    }
}

impl fmt::Debug for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Banner {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Incremental scanner state. All state needed to continue a partial prefix
/// match or a partial capture is carried over between chunks, so chunk
/// boundaries have no effect on the result.
///
/// Every occurrence of [`PREFIX`] starts a candidate, including occurrences
/// inside a capture that is still in progress. A nested candidate is a suffix
/// of the enclosing one, so it only matters when the enclosing capture is cut
/// off at [`MAX_LEN`].
struct ScanState {
    /// Number of bytes of [`PREFIX`] matched at the end of the previous input.
    matched: usize,
    /// Banners currently being captured, oldest first. The oldest capture is
    /// always the longest one.
    captures: VecDeque<String>,
    /// Longest completed banner so far. The first one wins on ties.
    longest: Option<Banner>,
}

impl ScanState {
    fn new() -> Self {
        Self {
            matched: 0,
            captures: VecDeque::new(),
            longest: None,
        }
    }

    /// Process the next chunk of input. Returns a banner if a strong match
    /// was found, in which case the rest of the input can be skipped.
    fn feed(&mut self, mut data: &[u8]) -> Option<Banner> {
        while !data.is_empty() {
            if self.captures.is_empty() && self.matched == 0 {
                let Some(offset) = memchr(PREFIX[0], data) else {
                    break;
                };

                self.matched = 1;
                data = &data[offset + 1..];
                continue;
            }

            let b = data[0];
            data = &data[1..];

            if let Some(banner) = self.step(b) {
                return Some(banner);
            }
        }

        None
    }

    /// Process a single byte while a prefix match or a capture is in progress.
    fn step(&mut self, b: u8) -> Option<Banner> {
        if b == b'\n' || b == b'\r' {
            while let Some(capture) = self.captures.pop_front() {
                if let Some(banner) = self.finish_capture(capture) {
                    return Some(banner);
                }
            }
        } else if is_banner_byte(b) {
            for capture in &mut self.captures {
                capture.push(char::from(b));
            }

            if self.captures.front().is_some_and(|c| c.len() >= MAX_LEN)
                && let Some(capture) = self.captures.pop_front()
                && let Some(banner) = self.finish_capture(capture)
            {
                return Some(banner);
            }
        }

        if self.match_prefix(b) {
            self.captures.push_back(String::from_utf8_lossy(PREFIX).into_owned());
        }

        None
    }

    /// Advance the prefix matcher. Returns true when a full prefix was just
    /// matched.
    fn match_prefix(&mut self, b: u8) -> bool {
        if b == PREFIX[self.matched] {
            self.matched += 1;

            if self.matched == PREFIX.len() {
                self.matched = 0;
                return true;
            }
        } else if b == PREFIX[0] {
            // The first byte does not appear anywhere else in the prefix, so
            // this is the only possible restart point.
            self.matched = 1;
        } else {
            self.matched = 0;
        }

        false
    }

    /// Complete a capture. Returns the banner if it is a strong match.
    fn finish_capture(&mut self, capture: String) -> Option<Banner> {
        let banner = Banner(capture);
        trace!("Banner candidate: {banner:?}");

        if banner.is_strong_match() {
            return Some(banner);
        }

        if self
            .longest
            .as_ref()
            .is_none_or(|longest| banner.len() > longest.len())
        {
            self.longest = Some(banner);
        }

        None
    }

    fn finish(mut self) -> Option<Banner> {
        while let Some(capture) = self.captures.pop_front() {
            if let Some(banner) = self.finish_capture(capture) {
                return Some(banner);
            }
        }

        self.longest
    }
}

/// Finds the best `Linux version ...` banner in a byte stream.
///
/// The stream is read in bounded chunks, so memory usage does not depend on
/// the size of the input. The first candidate that looks like a complete
/// Android kernel banner (see [`Banner::is_strong_match`]) is returned
/// immediately. Otherwise, the longest candidate in the entire stream wins.
#[derive(Clone, Copy, Debug)]
pub struct BannerScanner {
    chunk_size: usize,
}

impl Default for BannerScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BannerScanner {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Use a different read size. Mostly useful for testing chunk boundary
    /// handling.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "Chunk size must be non-zero");
        self.chunk_size = chunk_size;
        self
    }

    /// Scan all of `reader`. Only I/O errors from the reader itself or
    /// cancellation are reported as errors.
    pub fn scan(
        &self,
        reader: impl Read,
        cancel_signal: &AtomicBool,
    ) -> io::Result<Option<Banner>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut state = ScanState::new();

        let strong =
            stream::read_chunks(reader, &mut buf, |chunk| state.feed(chunk), cancel_signal)?;
        if let Some(banner) = strong {
            debug!("Found strong banner match: {banner:?}");
            return Ok(Some(banner));
        }

        let banner = state.finish();
        debug!("Longest banner match: {banner:?}");

        Ok(banner)
    }

    /// Scan a byte slice that is already in memory.
    pub fn scan_bytes(&self, data: &[u8]) -> Option<Banner> {
        let mut state = ScanState::new();

        for chunk in data.chunks(self.chunk_size) {
            if let Some(banner) = state.feed(chunk) {
                return Some(banner);
            }
        }

        state.finish()
    }

    /// Scan a file. A missing or unreadable file is treated the same as a file
    /// with no banner. An error is only returned if the operation was
    /// cancelled.
    pub fn scan_file(
        &self,
        path: &Path,
        cancel_signal: &AtomicBool,
    ) -> io::Result<Option<Banner>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open kernel image: {path:?}: {e}");
                return Ok(None);
            }
        };

        match self.scan(file, cancel_signal) {
            Ok(banner) => Ok(banner),
            Err(e) => {
                stream::check_cancel(cancel_signal)?;
                warn!("Failed to read kernel image: {path:?}: {e}");
                Ok(None)
            }
        }
    }
}
