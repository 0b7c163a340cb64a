use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed bitstream in {stage} ({width}x{height}): {detail}")]
    MalformedBitstream {
        stage: &'static str,
        width: usize,
        height: usize,
        detail: String,
    },

    #[error("Cannot allocate {what} for a {width}x{height} image in {stage}")]
    ResourceExhausted {
        stage: &'static str,
        width: usize,
        height: usize,
        what: &'static str,
    },

    #[error("Inconsistent metadata in {stage} ({width}x{height}): {detail}")]
    InconsistentMetadata {
        stage: &'static str,
        width: usize,
        height: usize,
        detail: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Allocates a zero-filled buffer of `len` elements, reporting allocation
/// failure as [`ConversionError::ResourceExhausted`] instead of aborting.
pub fn try_alloc<T: Clone + Default>(
    len: usize,
    stage: &'static str,
    what: &'static str,
    width: usize,
    height: usize,
) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ConversionError::ResourceExhausted { stage, width, height, what })?;
    buf.resize(len, T::default());
    Ok(buf)
}
