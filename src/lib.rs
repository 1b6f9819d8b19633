//! # au3x — AU3 script container extraction engine
//!
//! Reverse-engineers the resource container a certain scripting-language
//! compiler appends to its compiled Windows executables. Format
//! guarantees this crate relies on:
//! - The container is found by brute-forcing a single-byte XOR mask
//!   against two known 16-byte magic headers — there is no fixed offset
//!   and no host container format (PE, ELF, ...) is ever parsed
//! - All three known format versions (`EA06`, `EA05`, legacy) share one
//!   resource record shape; only the per-field key schedule and PRNG
//!   differ
//! - Every numeric size field is validated against the remaining buffer
//!   length before use; a record list ends the moment a `FILE` marker
//!   fails to decrypt, never with a hard error
//! - Decompression is one of exactly three bespoke LZ/Huffman variants,
//!   chosen by format version; legacy payloads fall back from the fixed
//!   LZ scheme to the adaptive-Huffman (`JB01`) scheme on failure
//! - The compiled-token reader (`token.rs`) is the newest format's only
//!   path back to source text; plaintext payloads need no such reader

pub mod bitstream;
pub mod decompress;
pub mod error;
pub mod keys;
pub mod prng;
pub mod resource;
pub mod scan;
pub mod token;
pub mod util;

pub use error::{Au3Error, Result};
pub use resource::{AutoItResource, AutoItVersion, ResourceState, ResourceSummary};
pub use scan::{get_scripts, AutoItFile};
pub use token::{Lexer, Token, TokenType};

/// Caller-tunable knobs for a single extraction run, mirroring the
/// teacher crate's `PackOptions` builder pattern. Every field has a
/// sensible default; the CLI only overrides what a flag actually sets.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Tokens probed by [`AutoItResource::is_autoit_script`] before a
    /// resource is trusted as a genuine script and not incidental data.
    pub script_accuracy: u32,
    /// Eagerly call [`AutoItResource::decompress`] on every resource
    /// right after extraction, rather than leaving that to the caller.
    pub auto_decompress: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions { script_accuracy: 3, auto_decompress: true }
    }
}

/// Top-level library entry point: locate every embedded resource blob in
/// `data`, decrypt and (optionally) decompress each resource, and return
/// them alongside the detected format version. Partial results are
/// returned even when a later resource's decompression fails — only the
/// scanner's "no container found" and the decoder's "invalid compressed
/// size" are hard errors (the spec's error-propagation rule, see
/// `error.rs`).
pub fn extract(data: &[u8], opts: &ExtractOptions) -> Result<AutoItFile> {
    let mut file = scan::get_scripts(data)?;
    if opts.auto_decompress {
        decompress_all(&mut file.resources);
    }
    Ok(file)
}

/// Decompresses every resource in place. Each resource owns disjoint
/// buffers and its own decompressor instance (§5 of the spec this crate
/// implements), so there is no shared state to synchronize — with the
/// `parallel` feature enabled this runs across a Rayon pool instead of
/// sequentially; a single failing resource never blocks its siblings
/// either way, mirroring `decompress_all_sequential`'s error handling.
fn decompress_all(resources: &mut [AutoItResource]) {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        resources.par_iter_mut().for_each(|resource| {
            let _ = resource.decompress();
        });
    }
    #[cfg(not(feature = "parallel"))]
    {
        for resource in resources.iter_mut() {
            let _ = resource.decompress();
        }
    }
}
