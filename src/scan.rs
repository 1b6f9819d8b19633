//! Container scanner: finds embedded `AU3!...` script blobs inside an
//! arbitrary host binary by brute-forcing a single-byte XOR mask against
//! two known 16-byte magic headers, then slices out each blob's extent
//! for [`resource::unpack_script`](crate::resource::unpack_script).

use crate::error::{Au3Error, Result};
use crate::resource::{unpack_script, AutoItResource, AutoItVersion};

/// `EA06`'s container magic, as it appears once XOR-unmasked.
const AU3_HEADER_EA06: [u8; 16] =
    [0xa3, 0x48, 0x4b, 0xbe, 0x98, 0x6c, 0x4a, 0xa9, 0x99, 0x4c, 0x53, 0x0a, 0x86, 0xd6, 0x48, 0x7d];
/// `EA05`'s container magic — the same bytes with the 6th/7th pair swapped.
const AU3_HEADER_EA05: [u8; 16] =
    [0xa3, 0x48, 0x4b, 0xbe, 0x98, 0x6c, 0xa9, 0x4a, 0x99, 0x4c, 0x53, 0x0a, 0x86, 0xd6, 0x48, 0x7d];
const AU3_HEADERS: [&[u8; 16]; 2] = [&AU3_HEADER_EA06, &AU3_HEADER_EA05];

/// All extracted resources from one host file, plus the container
/// version they were decoded under.
pub struct AutoItFile {
    pub resources: Vec<AutoItResource>,
    pub version: AutoItVersion,
}

/// Every offset in `unmasked` (the XOR-unmasked candidate buffer) where
/// one of the known magic headers starts, scanning left to right and
/// resuming immediately after each hit (headers may repeat back to back).
fn find_headers(unmasked: &[u8]) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut cursor = 0usize;
    while cursor < unmasked.len() {
        let mut best: Option<usize> = None;
        for hdr in AU3_HEADERS {
            if let Some(idx) = find_subslice(&unmasked[cursor..], hdr) {
                best = Some(match best {
                    Some(b) if b <= idx => b,
                    _ => idx,
                });
            }
        }
        match best {
            Some(idx) => {
                hits.push(cursor + idx);
                cursor += idx + 1;
            }
            None => break,
        }
    }
    hits
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Brute-forces the single-byte XOR mask, locates every candidate blob
/// start, resolves each one's `AU3!...` subtype and extent, and unpacks
/// every resource found across the host file.
pub fn get_scripts(data: &[u8]) -> Result<AutoItFile> {
    let mut mask = 0u8;
    let mut positions = Vec::new();
    let mut unmasked = Vec::new();
    loop {
        unmasked = data.iter().map(|&b| b ^ mask).collect();
        positions = find_headers(&unmasked);
        if !positions.is_empty() || mask == 0xff {
            break;
        }
        mask += 1;
    }
    if positions.is_empty() {
        return Err(Au3Error::ScriptNotFound);
    }

    let mut start_pos = 0usize;
    let mut end_pos: Option<usize> = None;
    let mut possible_scripts: Vec<(usize, usize)> = Vec::new();
    let mut subtype = String::new();

    for &p in &positions {
        start_pos = p;
        if p + 0x18 > unmasked.len() {
            continue;
        }
        let candidate = String::from_utf8_lossy(&unmasked[p + 0x10..p + 0x18]).into_owned();
        if !candidate.starts_with("AU3!") {
            continue;
        }
        let tail_start = p + 0x19;
        let stop = if tail_start <= unmasked.len() {
            rfind_subslice(&unmasked[tail_start..], candidate.as_bytes()).map(|i| tail_start + i)
        } else {
            None
        }
        .unwrap_or(tail_start.saturating_sub(1));
        subtype = candidate;
        end_pos = Some(stop);
        insert_unique(&mut possible_scripts, p, stop);
    }

    let mut is_legacy_fallback = false;
    if end_pos.is_none() && start_pos > 0 {
        let stop = unmasked.len().saturating_sub(4);
        insert_unique(&mut possible_scripts, start_pos, stop);
        is_legacy_fallback = true;
        subtype = "AU3!OLD".to_string();
    }

    if possible_scripts.is_empty() || subtype.is_empty() {
        return Err(Au3Error::ScriptNotFound);
    }

    let version = match subtype.as_str() {
        "AU3!EA06" => AutoItVersion::Ea06,
        "AU3!EA05" => AutoItVersion::Ea05,
        _ => AutoItVersion::Legacy,
    };

    // A fault unpacking one blob (an undersized header, an invalid
    // compressed size) never discards resources already recovered from
    // other blobs in this file — partial success is preferred (spec §7).
    let mut resources = Vec::new();
    for (start, end) in possible_scripts {
        let end = end.min(unmasked.len());
        if start >= end {
            continue;
        }
        let script = &unmasked[start..end];
        if let Ok(mut found) = unpack_script(script, is_legacy_fallback, version) {
            resources.append(&mut found);
        }
    }

    Ok(AutoItFile { resources, version })
}

fn insert_unique(scripts: &mut Vec<(usize, usize)>, start: usize, end: usize) {
    if !scripts.iter().any(|&(s, _)| s == start) {
        scripts.push((start, end));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ea06_blob() -> Vec<u8> {
        let mut buf = vec![0u8; 0x28];
        buf.extend_from_slice(&AU3_HEADER_EA06);
        buf.extend_from_slice(b"AU3!EA06");
        buf.extend_from_slice(&[0u8; 0x10]);
        buf.extend_from_slice(&[1u8; 0x10]);
        buf.extend_from_slice(b"AU3!EA06");
        buf
    }

    #[test]
    fn finds_unmasked_header_at_its_offset() {
        let blob = build_ea06_blob();
        let hits = find_headers(&blob);
        assert_eq!(hits, vec![0x28]);
    }

    #[test]
    fn finds_header_after_xor_masking() {
        let mask = 0x37u8;
        let blob: Vec<u8> = build_ea06_blob().into_iter().map(|b| b ^ mask).collect();
        assert!(find_headers(&blob).is_empty());
        let unmasked: Vec<u8> = blob.into_iter().map(|b| b ^ mask).collect();
        assert_eq!(find_headers(&unmasked), vec![0x28]);
    }

    #[test]
    fn no_header_anywhere_is_script_not_found() {
        let data = vec![0x41u8; 64];
        let err = get_scripts(&data).unwrap_err();
        assert!(matches!(err, Au3Error::ScriptNotFound));
    }
}
