//! Lossless JPEG decoding
//!
//! Huffman-coded sensor differences ("lossless JPEG", SOF3) as used by many
//! camera formats: bit reader, decode tables, the row decoder and a reader
//! that turns the decoded rows into a sensor mosaic.

mod bit_reader;
mod decoder;
mod error;
mod huffman;
mod reader;

#[cfg(test)]
mod tests;

pub use bit_reader::BitReader;
pub use decoder::{LjpegDecoder, LjpegHeader};
pub use error::LjpegError;
pub use huffman::HuffmanTable;
pub use reader::{LosslessJpegReader, Slices};
