use thiserror::Error;

/// Closed set of faults the container scanner, resource decoder and
/// decompressors can raise. There is no nested cause chain: every
/// variant carries exactly the context needed to explain itself.
#[derive(Error, Debug)]
pub enum Au3Error {
    #[error("script not found")]
    ScriptNotFound,

    #[error("decompress failed")]
    DecompressFailed,

    #[error("invalid signature in compressed data: {0:?}")]
    InvalidSignature([u8; 4]),

    #[error("invalid compressed size: {0}")]
    InvalidCompressedSize(u32),

    #[error("index out of bounds at offset {0}")]
    OutOfBounds(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Au3Error>;
