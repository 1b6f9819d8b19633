//! Decompressor for pre-EA05 resources. A legacy buffer may already be
//! plaintext, may use the legacy fixed-width LZ scheme, or — despite the
//! "legacy" label — may actually be JB01-compressed; all three are
//! tried in that order.

use crate::bitstream::BitReader;
use crate::error::{Au3Error, Result};
use crate::util::{copy_overlapping, is_printable, report_progress_page};

use super::jb01::Jb01Decompressor;
use super::Decompressor;

pub struct LegacyDecompressor {
    input: Vec<u8>,
    decompressed_size: usize,
}

impl LegacyDecompressor {
    pub fn new(input: Vec<u8>, decompressed_size: u32) -> Self {
        LegacyDecompressor { input, decompressed_size: decompressed_size as usize }
    }

    /// The legacy fixed-width LZ scheme: skip a 4-byte signature and a
    /// 32-bit size built from two 16-bit reads, then a 1-bit
    /// literal/match choice, a 13-bit back-offset and a 4-bit run count.
    /// Unlike the EA05/EA06 reader this one is fault-tolerant: any
    /// overrun surfaces as [`Au3Error::OutOfBounds`] or
    /// [`Au3Error::DecompressFailed`] so the caller can fall back to JB01.
    fn legacy_decompress(&self, mut progress: Option<&mut dyn FnMut(usize, usize)>) -> Result<Vec<u8>> {
        let mut reader = BitReader::new(&self.input, 0);
        for _ in 0..4 {
            reader.extract_bits(8)?;
        }
        let _size = (reader.extract_bits(16)? << 16) | reader.extract_bits(16)?;

        let mut out = vec![0u8; self.decompressed_size];
        let mut out_pos = 0usize;
        let mut last_reported = 0usize;
        while out_pos < self.decompressed_size {
            let choice = reader.extract_bits(1)?;
            if choice == 0 {
                out[out_pos] = reader.extract_bits(8)? as u8;
                out_pos += 1;
            } else {
                let offset = reader.extract_bits(13)? as i64;
                let delta = out_pos as i64 - 3 - offset;
                let count = 3 + reader.extract_bits(4)? as usize;
                if out_pos + count >= self.decompressed_size || delta < 0 || delta as usize + count > self.decompressed_size {
                    return Err(Au3Error::DecompressFailed);
                }
                copy_overlapping(&mut out, out_pos, delta as usize, count);
                out_pos += count;
            }
            last_reported =
                report_progress_page(progress.as_deref_mut(), last_reported, out_pos, self.decompressed_size);
        }
        Ok(out)
    }
}

impl Decompressor for LegacyDecompressor {
    fn decompress_with_progress(&mut self, mut progress: Option<&mut dyn FnMut(usize, usize)>) -> Result<Vec<u8>> {
        if is_printable(&self.input) {
            return Ok(self.input.clone());
        }
        match self.legacy_decompress(progress.as_deref_mut()) {
            Ok(out) => Ok(out),
            Err(_) => {
                Jb01Decompressor::new(self.input.clone(), self.decompressed_size).decompress_with_progress(progress)
            }
        }
    }
}
