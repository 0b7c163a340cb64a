//! RAW image reading module
//!
//! This module provides the sensor image model and format-agnostic RAW reading capabilities.

mod reader;
mod rawloader_reader;
mod unpacked_reader;
pub mod bad_pixels;
pub mod types;

#[cfg(test)]
mod tests;

pub use bad_pixels::fix_bad_pixels;
pub use reader::RawImageReader;
pub use rawloader_reader::RawLoaderReader;
pub use unpacked_reader::{ByteOrder, UnpackedReader};
pub use types::{CfaPattern, RawFrame, RawImage, RawMetadata, SensorLayout};
