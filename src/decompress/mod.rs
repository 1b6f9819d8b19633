//! Resource payload decompressors. There is a closed set of three:
//! EA05/EA06 share one LZ bitstream reader (`ea_lz`), legacy resources
//! get their own fixed-width LZ reader that falls back to the adaptive
//! Huffman scheme (`jb01`) on failure.

mod ea_lz;
mod jb01;
mod legacy;

pub use ea_lz::EaLzDecompressor;
pub use jb01::Jb01Decompressor;
pub use legacy::LegacyDecompressor;

use crate::error::Result;
use crate::resource::AutoItVersion;

pub trait Decompressor {
    fn decompress(&mut self) -> Result<Vec<u8>> {
        self.decompress_with_progress(None)
    }

    /// As [`Decompressor::decompress`], but invokes `progress(done, total)`
    /// synchronously on this thread at page boundaries (every 4096
    /// decompressed bytes). Callers needing background handling must
    /// re-dispatch from inside the callback themselves — the decoder never
    /// blocks on it or spawns anything.
    fn decompress_with_progress(&mut self, progress: Option<&mut dyn FnMut(usize, usize)>) -> Result<Vec<u8>>;
}

/// Picks the decompressor a resource's container format requires.
pub fn create_decompressor(version: AutoItVersion, input: Vec<u8>, decompressed_size: u32) -> Box<dyn Decompressor> {
    match version {
        AutoItVersion::Ea06 => Box::new(EaLzDecompressor::new_ea06(input, decompressed_size)),
        AutoItVersion::Ea05 => Box::new(EaLzDecompressor::new_ea05(input, decompressed_size)),
        AutoItVersion::Legacy => Box::new(LegacyDecompressor::new(input, decompressed_size)),
    }
}
