//! Small standalone helpers shared by the scanner, resource decoder and
//! decompressors: the printability heuristic, FILETIME conversion, UTF-16
//! decoding and the overlapping-copy primitive LZ back-references need.

use chrono::{DateTime, Utc};

/// Every byte `copy_from_slice` would refuse to do in one call because
/// source and destination may alias (LZ back-references can read bytes
/// they themselves just wrote, e.g. a run-length match). Copies forward,
/// one byte at a time, within a single buffer.
pub fn copy_overlapping(buf: &mut [u8], dst_start: usize, src_start: usize, len: usize) {
    for i in 0..len {
        buf[dst_start + i] = buf[src_start + i];
    }
}

/// Page size at which decompressors fire their optional progress callback.
pub const PROGRESS_PAGE_SIZE: usize = 4096;

/// Fires `cb(done, total)` the first time `done` crosses a
/// [`PROGRESS_PAGE_SIZE`] boundary relative to `last_reported`, returning
/// the new "last reported" cursor. A no-op when `cb` is `None`.
pub fn report_progress_page(
    cb: Option<&mut dyn FnMut(usize, usize)>,
    last_reported: usize,
    done: usize,
    total: usize,
) -> usize {
    match cb {
        Some(cb) if done - last_reported >= PROGRESS_PAGE_SIZE || done >= total => {
            cb(done, total);
            done
        }
        _ => last_reported,
    }
}

const PRINTABLE: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ \t\n\r\x0b\x0c";

/// A non-empty buffer where every byte is ASCII letter/digit/punctuation
/// or whitespace (including CR/LF/TAB/VT/FF).
pub fn is_printable(buf: &[u8]) -> bool {
    !buf.is_empty() && buf.iter().all(|b| PRINTABLE.contains(b))
}

/// Decode a little-endian UTF-16 byte buffer, dropping a trailing odd byte.
pub fn from_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Windows FILETIME (100ns ticks since 1601-01-01) to a UTC timestamp.
/// Returns `None` for the epoch sentinel (`0`), matching the source's
/// behavior of simply not interpreting untouched/zeroed fields as dates.
pub fn filetime_to_utc(filetime: i64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let unix_ns = (filetime - 116_444_736_000_000_000) * 100;
    DateTime::from_timestamp(unix_ns / 1_000_000_000, (unix_ns.rem_euclid(1_000_000_000)) as u32)
}

/// Strip `<`/`>`, keep only the basename, and default to a `.bin`
/// extension when the tag carries none. Used by the CLI's `extract`
/// subcommand to name files under its `dump/` directory.
pub fn sanitize_dump_name(tag: &str) -> String {
    let cleaned: String = tag.chars().filter(|&c| c != '<' && c != '>').collect();
    let base = cleaned.rsplit(['\\', '/']).next().unwrap_or(&cleaned).to_string();
    if base.contains('.') {
        base
    } else {
        format!("{base}.bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_rejects_empty_and_control_bytes() {
        assert!(!is_printable(b""));
        assert!(!is_printable(&[0x01, 0x02]));
        assert!(is_printable(b"hello, world!\n"));
    }

    #[test]
    fn overlapping_copy_handles_aliasing_within_one_byte() {
        let mut buf = vec![1u8, 0, 0, 0];
        copy_overlapping(&mut buf, 1, 0, 3);
        assert_eq!(buf, vec![1, 1, 1, 1]);
    }

    #[test]
    fn sanitize_dump_name_strips_path_and_defaults_extension() {
        assert_eq!(sanitize_dump_name("C:\\scripts\\<main>"), "main.bin");
        assert_eq!(sanitize_dump_name("foo\\bar.au3"), "bar.au3");
    }
}
