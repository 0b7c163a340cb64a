use thiserror::Error;

/// Low-level decode failures. [`super::LjpegDecoder`] attaches the stage and
/// frame size before handing them to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LjpegError {
    #[error("stream does not start with an SOI marker")]
    MissingSoi,

    #[error("expected a marker, found 0x{0:04x}")]
    NotAMarker(u16),

    #[error("segment 0x{0:04x} is truncated")]
    Truncated(u16),

    #[error("unexpected end of entropy-coded data")]
    UnexpectedEof,

    #[error("invalid frame header: {0}")]
    BadFrame(String),

    #[error("invalid Huffman table {table}: {detail}")]
    BadTable { table: usize, detail: String },

    #[error("Huffman table {0} is referenced but never defined")]
    MissingTable(usize),

    #[error("bit sequence does not match any Huffman code")]
    InvalidCode,

    #[error("difference length {len} exceeds the {bits}-bit sample precision")]
    LengthOverflow { len: u8, bits: u8 },

    #[error("restart marker expected: {0}")]
    MissingRestart(String),

    #[error("read past the last of {0} rows")]
    RowsExhausted(usize),

    #[error("unsupported lossless JPEG feature: {0}")]
    Unsupported(String),
}
