//! End-to-end test against a hand-built `EA06` container: encrypts a
//! single empty `FILE` record with the real key schedule (the stream
//! cipher is its own inverse, so encoding is just decoding with fresh
//! state) and feeds the whole thing through the public entry point.

use au3x::keys::{Ea06Keys, KeySchedule};
use au3x::resource::{AutoItVersion, ResourceState};
use au3x::{extract, get_scripts, ExtractOptions};

/// `EA06`'s container magic, XOR-unmasked. Mirrors `scan.rs`'s private
/// constant of the same bytes — duplicated here since the scanner
/// doesn't need to expose it outside the crate.
const AU3_HEADER_EA06: [u8; 16] =
    [0xa3, 0x48, 0x4b, 0xbe, 0x98, 0x6c, 0x4a, 0xa9, 0x99, 0x4c, 0x53, 0x0a, 0x86, 0xd6, 0x48, 0x7d];

/// Builds a minimal but fully valid `EA06` blob: magic + subtype + a
/// 16-byte zero hash, one `FILE` record with every size field zeroed
/// (no tag, no path, uncompressed, no payload), and a trailing copy of
/// the subtype marker so the scanner can find the blob's extent.
fn build_s1_ea06_container() -> Vec<u8> {
    let hash = vec![0u8; 16];
    let mut keys = Ea06Keys::new();
    keys.set_hash(hash.clone());

    let mut buf = Vec::new();
    buf.extend_from_slice(&AU3_HEADER_EA06);
    buf.extend_from_slice(b"AU3!EA06");
    buf.extend_from_slice(&hash);

    let file_key = keys.file();
    buf.extend(keys.decode_stream(b"FILE", file_key));

    let tag_size_key = keys.tag_size();
    buf.extend_from_slice(&((0i32 ^ tag_size_key.value) as u32).to_le_bytes());
    // tag itself: zero length, no bytes

    let path_size_key = keys.path_size();
    buf.extend_from_slice(&((0i32 ^ path_size_key.value) as u32).to_le_bytes());
    // path itself: zero length, no bytes

    buf.push(0); // isCompressed = false

    let compressed_size_key = keys.compressed_size();
    buf.extend_from_slice(&((0i32 ^ compressed_size_key.value) as u32).to_le_bytes());

    let decompressed_size_key = keys.decompressed_size();
    buf.extend_from_slice(&((0i32 ^ decompressed_size_key.value) as u32).to_le_bytes());

    let checksum_key = keys.checksum();
    buf.extend_from_slice(&((0i32 ^ checksum_key.value) as u32).to_le_bytes());

    buf.extend_from_slice(&[0u8; 16]); // creation + modified FILETIME, both zero

    buf.extend_from_slice(b"AU3!EA06"); // trailing marker, closes the blob's extent

    buf
}

#[test]
fn s1_minimal_container_extracts_one_empty_resource() {
    let container = build_s1_ea06_container();
    let file = get_scripts(&container).expect("scanner should find the blob");

    assert_eq!(file.version, AutoItVersion::Ea06);
    assert_eq!(file.resources.len(), 1);

    let res = &file.resources[0];
    assert!(!res.is_compressed);
    assert_eq!(res.compressed_size, 0);
    assert_eq!(res.decompressed_size, 0);
    assert_eq!(res.checksum, 0);
    assert!(res.data.is_empty());
    assert_eq!(res.state, ResourceState::Initialized);
    assert_eq!(res.name(), "");
}

#[test]
fn s1_container_survives_a_single_byte_xor_mask() {
    let mask = 0x5a;
    let masked: Vec<u8> = build_s1_ea06_container().into_iter().map(|b| b ^ mask).collect();
    let file = get_scripts(&masked).expect("scanner should brute-force the mask");
    assert_eq!(file.resources.len(), 1);
}

#[test]
fn extract_entry_point_leaves_an_empty_resource_untouched_by_decompression() {
    let container = build_s1_ea06_container();
    let file = extract(&container, &ExtractOptions::default()).expect("extract should succeed");
    assert_eq!(file.resources.len(), 1);
    // is_compressed is false, so decompress() is a no-op and the state
    // stays Initialized rather than advancing to Decompressed.
    assert_eq!(file.resources[0].state, ResourceState::Initialized);
}

#[test]
fn host_bytes_surrounding_the_container_are_ignored() {
    let mut data = vec![0x90u8; 37]; // unrelated prefix bytes, as in a real host exe
    data.extend(build_s1_ea06_container());
    data.extend(vec![0x00u8; 11]); // unrelated trailer padding

    let file = get_scripts(&data).expect("scanner should skip the host padding");
    assert_eq!(file.resources.len(), 1);
}

#[test]
fn no_container_in_arbitrary_data_is_script_not_found() {
    let data = vec![0x41u8; 128];
    assert!(get_scripts(&data).is_err());
}
