//! LZ77-style decompressor used by `EA05`/`EA06` resources. The two
//! formats share every detail except which bit value means "literal
//! byte" versus "back-reference" — EA05 uses `0`, EA06 uses `1`.

use byteorder::{BigEndian, ByteOrder};

use crate::bitstream::BitReader;
use crate::error::{Au3Error, Result};
use crate::util::{copy_overlapping, report_progress_page};

use super::Decompressor;

pub struct EaLzDecompressor {
    input: Vec<u8>,
    decompressed_size: usize,
    signature: &'static [u8; 4],
    literal_bit: u32,
}

impl EaLzDecompressor {
    pub fn new_ea05(input: Vec<u8>, decompressed_size: u32) -> Self {
        EaLzDecompressor { input, decompressed_size: decompressed_size as usize, signature: b"EA05", literal_bit: 0 }
    }

    pub fn new_ea06(input: Vec<u8>, decompressed_size: u32) -> Self {
        EaLzDecompressor { input, decompressed_size: decompressed_size as usize, signature: b"EA06", literal_bit: 1 }
    }
}

impl Decompressor for EaLzDecompressor {
    fn decompress_with_progress(&mut self, mut progress: Option<&mut dyn FnMut(usize, usize)>) -> Result<Vec<u8>> {
        if self.input.len() < 8 {
            return Err(Au3Error::OutOfBounds(self.input.len()));
        }
        let signature: [u8; 4] = self.input[0..4].try_into().unwrap();
        if &signature != self.signature {
            return Err(Au3Error::InvalidSignature(signature));
        }
        let declared_size = BigEndian::read_u32(&self.input[4..8]) as usize;
        let size = self.decompressed_size.max(declared_size);

        let mut out = vec![0u8; size];
        let mut out_pos = 0usize;
        let mut last_reported = 0usize;
        let mut reader = BitReader::new(&self.input, 8);

        while out_pos < size {
            let choice = reader.extract_bits(1)?;
            if choice == self.literal_bit {
                out[out_pos] = reader.extract_bits(8)? as u8;
                out_pos += 1;
            } else {
                let v = reader.extract_bits(0xf)? as usize;
                let len = reader.extract_length_code()? as usize;
                let delta = out_pos.checked_sub(v).ok_or(Au3Error::OutOfBounds(out_pos))?;
                if out_pos + len > out.len() || delta + len > out.len() {
                    return Err(Au3Error::OutOfBounds(out_pos + len));
                }
                copy_overlapping(&mut out, out_pos, delta, len);
                out_pos += len;
            }
            last_reported = report_progress_page(progress.as_deref_mut(), last_reported, out_pos, size);
        }
        Ok(out)
    }
}
