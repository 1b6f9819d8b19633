//! A single embedded resource: its metadata, its (still encrypted, maybe
//! compressed) payload, and the lifecycle it moves through as a caller
//! decompresses and inspects it.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decompress::create_decompressor;
use crate::error::{Au3Error, Result};
use crate::keys::{Ea05Keys, Ea06Keys, KeySchedule, LegacyKeys};
use crate::token::Lexer;
use crate::util::{filetime_to_utc, from_utf16le, is_printable};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoItVersion {
    Ea06,
    Ea05,
    Legacy,
}

impl fmt::Display for AutoItVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutoItVersion::Ea06 => "AU3.EA06",
            AutoItVersion::Ea05 => "AU3.EA05",
            AutoItVersion::Legacy => "Legacy",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceState {
    Initialized,
    Decompressed,
    Decompiled,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::Initialized => "Extracted",
            ResourceState::Decompressed => "Decompressed",
            ResourceState::Decompiled => "Decompiled",
        };
        write!(f, "{s}")
    }
}

pub struct AutoItResource {
    pub tag: String,
    pub path: String,
    pub is_compressed: bool,
    pub compressed_size: u32,
    pub decompressed_size: u32,
    pub checksum: u32,
    pub creation_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    pub data: Vec<u8>,
    pub state: ResourceState,
    pub version: AutoItVersion,
}

impl AutoItResource {
    /// Basename of `tag`, stripping any `\`-separated compile-time path.
    pub fn name(&self) -> &str {
        self.tag.rsplit('\\').next().unwrap_or(&self.tag)
    }

    /// Decrypted payload in, plaintext payload out. No-op if the
    /// resource was never compressed. Falls back to UTF-16 decoding if
    /// the decompressed bytes aren't printable as-is.
    pub fn decompress(&mut self) -> Result<()> {
        if self.is_compressed {
            let mut decompressor = create_decompressor(self.version, self.data.clone(), self.decompressed_size);
            let buf = decompressor.decompress()?;
            if !self.data.is_empty() && buf.is_empty() {
                return Err(Au3Error::DecompressFailed);
            }
            self.data = buf;
            self.state = ResourceState::Decompressed;
        }
        if !is_printable(&self.data) {
            let wide = from_utf16le(&self.data).into_bytes();
            if is_printable(&wide) {
                self.data = wide;
            }
        }
        Ok(())
    }

    /// Binary compiled-token reader over the current payload. Plaintext
    /// (already-decompiled) scripts use a separate textual tokenizer,
    /// out of scope here — this crate only reconstructs the compiled
    /// token stream of `EA06`-family resources.
    pub fn create_tokenizer(&self) -> Lexer<'_> {
        Lexer::new(&self.data)
    }

    /// Heuristic check used to decide whether a resource is worth
    /// decompiling: walk up to `accuracy` tokens and bail the moment one
    /// is malformed. Plaintext payloads are trusted outright, since
    /// validating them is the plaintext tokenizer's job, not this
    /// reader's.
    pub fn is_autoit_script(&self, accuracy: u32) -> bool {
        if is_printable(&self.data) {
            return !self.data.is_empty();
        }
        if !self.tag.contains("SCRIPT") {
            return false;
        }
        let mut lexer = self.create_tokenizer();
        for _ in 0..accuracy {
            let tok = lexer.next_token();
            if tok.token_type == crate::token::TokenType::Eof {
                break;
            }
            if tok.token_type == crate::token::TokenType::Invalid {
                return false;
            }
        }
        true
    }

    /// A JSON-friendly snapshot of this resource's metadata, for the
    /// CLI's `--json` output. Timestamps are RFC 3339 strings rather
    /// than raw `DateTime` so no `serde` feature needs enabling on
    /// `chrono` just for this.
    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            name: self.name().to_string(),
            path: self.path.clone(),
            is_compressed: self.is_compressed,
            compressed_size: self.compressed_size,
            decompressed_size: self.decompressed_size,
            checksum: self.checksum,
            creation_time: self.creation_time.map(|t| t.to_rfc3339()),
            modified_time: self.modified_time.map(|t| t.to_rfc3339()),
            state: self.state.to_string(),
        }
    }
}

/// See [`AutoItResource::summary`].
#[derive(Clone, Debug, Serialize)]
pub struct ResourceSummary {
    pub name: String,
    pub path: String,
    pub is_compressed: bool,
    pub compressed_size: u32,
    pub decompressed_size: u32,
    pub checksum: u32,
    pub creation_time: Option<String>,
    pub modified_time: Option<String>,
    pub state: String,
}

impl fmt::Display for AutoItResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name())?;
        writeln!(f, "Path: {}", self.path)?;
        writeln!(f, "Compressed Size: {} bytes", self.compressed_size)?;
        writeln!(f, "Decompressed Size: {} bytes", self.decompressed_size)?;
        if let Some(t) = self.creation_time {
            writeln!(f, "Created at: {t}")?;
        }
        if let Some(t) = self.modified_time {
            writeln!(f, "Modified at: {t}")?;
        }
        Ok(())
    }
}

/// `None` on truncation — callers treat that as end-of-list, never as
/// an error (spec §4.2: "Any truncation … terminates the loop
/// gracefully, returning resources collected so far").
fn read_u32_opt(script: &[u8], pos: usize) -> Option<u32> {
    script.get(pos..pos + 4).map(LittleEndian::read_u32)
}

/// As [`read_u32_opt`], for an arbitrary-length byte range. Uses
/// `checked_add` so a corrupt length field overflowing `pos + len`
/// degrades to "truncated" rather than panicking.
fn take(script: &[u8], pos: usize, len: usize) -> Option<&[u8]> {
    let end = pos.checked_add(len)?;
    script.get(pos..end)
}

/// Walks the `FILE`-tagged record list of one blob, decrypting each
/// field in order with the version's key schedule. `is_legacy_fallback`
/// is the scanner's "no `AU3!...` subtype found" flag — distinct from
/// `version == Legacy`, since the two can in principle disagree (see
/// the checksum-field gate below, carried over from the source as-is).
///
/// A truncated record (any field read running past the end of `script`)
/// ends the record list and returns whatever was decoded so far, never
/// an error — only a structurally undersized blob (no room for the
/// fixed header) or a genuine validation failure (`InvalidCompressedSize`)
/// is an `Err` here.
pub fn unpack_script(script: &[u8], is_legacy_fallback: bool, version: AutoItVersion) -> Result<Vec<AutoItResource>> {
    let mut keys: Box<dyn KeySchedule> = match version {
        AutoItVersion::Ea06 => Box::new(Ea06Keys::new()),
        AutoItVersion::Ea05 => Box::new(Ea05Keys::new()),
        AutoItVersion::Legacy => Box::new(LegacyKeys::new(script.get(0x10) == Some(&1))),
    };

    if script.len() < 0x28 {
        return Err(Au3Error::OutOfBounds(script.len()));
    }
    keys.set_hash(script[0x18..0x28].to_vec());
    let mut pos = 0x28usize;
    let mut is_old_auto_it = false;
    let mut resources = Vec::new();

    if version == AutoItVersion::Legacy {
        let pass_len = match read_u32_opt(script, 0x11) {
            Some(v) => (v ^ 0xfac1) as usize,
            None => return Ok(resources),
        };
        let pass_bytes = match take(script, 0x15, pass_len) {
            Some(b) => b,
            None => return Ok(resources),
        };
        let pass_key = keys.pass_key();
        let pass = keys.decode_stream(pass_bytes, pass_key);
        if !is_printable(&pass) {
            is_old_auto_it = true;
        }
        keys.set_password(pass);
        pos = 0x15 + pass_len;
    }

    while pos < script.len() {
        let file_key = keys.file();
        let marker_bytes = match take(script, pos, 4) {
            Some(b) => b,
            None => break,
        };
        let marker = keys.decode_stream(marker_bytes, file_key);
        if marker.as_slice() != b"FILE" {
            break;
        }
        pos += 4;

        let tag_size_key = keys.tag_size();
        let tag_raw = match read_u32_opt(script, pos) {
            Some(v) => v as i32 ^ tag_size_key.value,
            None => break,
        };
        pos += 4;
        let mut tag_len = tag_raw;
        if keys.needs_unicode() {
            tag_len += tag_raw;
        }
        let tag_bytes = match usize::try_from(tag_len).ok().and_then(|n| take(script, pos, n)) {
            Some(b) => b,
            None => break,
        };
        let tag_key = keys.tag();
        let tag = keys.decode_string(tag_bytes, tag_key);
        pos += tag_bytes.len();

        let path_size_key = keys.path_size();
        let path_raw = match read_u32_opt(script, pos) {
            Some(v) => v as i32 ^ path_size_key.value,
            None => break,
        };
        pos += 4;
        let mut path_len = path_raw;
        if keys.needs_unicode() {
            path_len += path_raw;
        }
        let path_bytes = match usize::try_from(path_len).ok().and_then(|n| take(script, pos, n)) {
            Some(b) => b,
            None => break,
        };
        let path_key = keys.path();
        let path = keys.decode_string(path_bytes, path_key);
        pos += path_bytes.len();

        let is_compressed = match script.get(pos) {
            Some(&b) => b != 0,
            None => break,
        };
        pos += 1;

        let compressed_size_key = keys.compressed_size();
        let compressed_size = match read_u32_opt(script, pos) {
            Some(v) => (v as i32 ^ compressed_size_key.value) as u32,
            None => break,
        };
        pos += 4;
        if compressed_size as usize >= script.len() {
            return Err(Au3Error::InvalidCompressedSize(compressed_size));
        }

        let decompressed_size_key = keys.decompressed_size();
        let decompressed_size = match read_u32_opt(script, pos) {
            Some(v) => (v as i32 ^ decompressed_size_key.value) as u32,
            None => break,
        };
        pos += 4;

        let mut checksum = 0u32;
        if !is_legacy_fallback {
            let checksum_key = keys.checksum();
            checksum = match read_u32_opt(script, pos) {
                Some(v) => (v as i32 ^ checksum_key.value) as u32,
                None => break,
            };
            pos += 4;
        }

        let mut creation_time = None;
        let mut modified_time = None;
        if !is_old_auto_it {
            let (c_hi, c_lo) = match (read_u32_opt(script, pos), read_u32_opt(script, pos + 4)) {
                (Some(hi), Some(lo)) => (hi as i64, lo as i64),
                _ => break,
            };
            creation_time = filetime_to_utc((c_hi << 32) | c_lo);
            pos += 8;
            let (m_hi, m_lo) = match (read_u32_opt(script, pos), read_u32_opt(script, pos + 4)) {
                (Some(hi), Some(lo)) => (hi as i64, lo as i64),
                _ => break,
            };
            modified_time = filetime_to_utc((m_hi << 32) | m_lo);
            pos += 8;
        }

        let mut data = Vec::new();
        if compressed_size > 0 {
            let payload = match take(script, pos, compressed_size as usize) {
                Some(b) => b,
                None => break,
            };
            let data_key = keys.data();
            data = keys.decode_stream(payload, data_key);
            pos += compressed_size as usize;
        }

        resources.push(AutoItResource {
            tag,
            path,
            is_compressed,
            compressed_size,
            decompressed_size,
            checksum,
            creation_time,
            modified_time,
            data,
            state: ResourceState::Initialized,
            version,
        });
    }

    Ok(resources)
}
