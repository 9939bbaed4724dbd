// SPDX-FileCopyrightText: 2025 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

#[cfg(not(windows))]
mod fuzz {
    use std::{io::Cursor, sync::atomic::AtomicBool};

    use honggfuzz::fuzz;
    use kmi_info::format::banner::{self, BannerScanner};

    /// Straightforward quadratic search that tries a match at every offset.
    /// Candidates are ordered by the position where their capture ended.
    fn search_every_offset(data: &[u8]) -> Option<String> {
        let mut candidates = vec![];

        for start in 0..data.len() {
            if !data[start..].starts_with(banner::PREFIX) {
                continue;
            }

            let mut capture = String::new();
            let mut end = data.len();

            for (i, &b) in data.iter().enumerate().skip(start) {
                if b == b'\n' || b == b'\r' {
                    end = i;
                    break;
                } else if b.is_ascii_graphic() || matches!(b, b' ' | b'\t' | b'\x0b' | b'\x0c') {
                    capture.push(char::from(b));

                    if capture.len() >= banner::MAX_LEN {
                        end = i;
                        break;
                    }
                }
            }

            candidates.push((end, start, capture));
        }

        candidates.sort();

        let mut longest: Option<String> = None;

        for (_, _, capture) in candidates {
            let tokens = capture.split_ascii_whitespace().collect::<Vec<_>>();
            if tokens.contains(&"SMP") && tokens.contains(&"PREEMPT") {
                return Some(capture);
            }

            if longest.as_ref().is_none_or(|l| capture.len() > l.len()) {
                longest = Some(capture);
            }
        }

        longest
    }

    pub fn main() {
        loop {
            fuzz!(|data: &[u8]| {
                let cancel_signal = AtomicBool::new(false);
                let reader = Cursor::new(data);

                // Small chunks to exercise matches that cross chunk boundaries.
                let chunked = BannerScanner::new()
                    .with_chunk_size(3)
                    .scan(reader, &cancel_signal)
                    .unwrap();
                let whole = BannerScanner::new().scan_bytes(data);

                assert_eq!(chunked, whole);
                assert_eq!(
                    whole.map(|b| b.into_string()),
                    search_every_offset(data),
                );
            });
        }
    }
}

fn main() {
    #[cfg(not(windows))]
    fuzz::main();
}
