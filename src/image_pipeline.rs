//! Image processing pipeline module
//!
//! This module turns raw sensor data into viewable images: readers for the
//! supported raw encodings, the lossless JPEG decoder, demosaicing, exposure
//! correction, geometry normalization and TIFF output.

pub mod common;
pub mod raw;
pub mod ljpeg;
pub mod debayer;
pub mod exposure;
pub mod geometry;
pub mod tiff;
pub mod conversions;

pub use common::{
    ConversionError,
    PipelineConfig,
    PipelineConfigBuilder,
    Result,
    Warning,
    Warnings,
    WhiteBalance,
};

pub use raw::{
    ByteOrder,
    CfaPattern,
    RawFrame,
    RawImage,
    RawImageReader,
    RawLoaderReader,
    RawMetadata,
    SensorLayout,
    UnpackedReader,
};

pub use ljpeg::{LjpegDecoder, LosslessJpegReader};

pub use geometry::Orientation;

pub use tiff::{
    RgbImageData,
    TiffCompression,
    TiffWriter,
    StandardTiffWriter,
};

pub use conversions::{
    DevelopedImage,
    PipelineTimings,
    RawToTiffPipeline,
    develop,
};
