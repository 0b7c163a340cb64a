use std::io::Write;

use tracing::debug;

use crate::image_pipeline::common::config::PipelineConfig;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::tiff::types::{RgbImageData, TiffCompression};
use crate::image_pipeline::tiff::writer::TiffWriter;

/// Writes RGB8 for images with `maxval <= 255` and RGB16 otherwise; 16-bit
/// samples are stretched from `maxval` to the full 0..=65535 range.
pub struct StandardTiffWriter;

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, image: &RgbImageData, output: &mut dyn Write, config: &PipelineConfig) -> Result<()> {
        debug!("Encoding TIFF image: {}x{} (maxval {})", image.width, image.height, image.maxval);

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Best),
        };

        let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| ConversionError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => tiff::tags::Predictor::Horizontal,
                _ => tiff::tags::Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let (width, height) = (image.width as u32, image.height as u32);
        if image.maxval <= u8::MAX as u16 {
            let bytes: Vec<u8> = image.data.iter().map(|&v| v.min(255) as u8).collect();
            encoder
                .write_image::<tiff::encoder::colortype::RGB8>(width, height, &bytes)
                .map_err(|e| ConversionError::EncodeError(e.to_string()))?;
        } else {
            let scale = u16::MAX as u32;
            let max = image.maxval.max(1) as u32;
            let samples: Vec<u16> = image
                .data
                .iter()
                .map(|&v| ((v as u32).min(max) * scale / max) as u16)
                .collect();
            encoder
                .write_image::<tiff::encoder::colortype::RGB16>(width, height, &samples)
                .map_err(|e| ConversionError::EncodeError(e.to_string()))?;
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
