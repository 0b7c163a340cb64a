//! Reader for sensor dumps stored as plain 16-bit samples.

use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result, try_alloc};
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{CfaPattern, RawFrame, RawImage, RawMetadata, SensorLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Reads an uncompressed `raw_width x raw_height` grid of 16-bit samples.
#[derive(Debug, Clone)]
pub struct UnpackedReader {
    pub layout: SensorLayout,
    pub byte_order: ByteOrder,
    pub colors: usize,
    pub cfa: CfaPattern,
    pub metadata: RawMetadata,
    /// Replace `metadata.black` with the mean of the masked columns.
    pub black_from_margin: bool,
}

impl UnpackedReader {
    pub fn new(layout: SensorLayout, cfa: CfaPattern, metadata: RawMetadata) -> Self {
        Self {
            layout,
            byte_order: ByteOrder::Little,
            colors: 3,
            cfa,
            metadata,
            black_from_margin: false,
        }
    }
}

impl RawImageReader for UnpackedReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame> {
        self.layout.validate()?;
        let needed = self.layout.raw_len() * 2;
        debug!(
            "Reading unpacked sensor data: {}x{} readout, {} bytes",
            self.layout.raw_width,
            self.layout.raw_height,
            data.len()
        );
        if data.len() < needed {
            return Err(ConversionError::DecodeError(format!(
                "expected {} bytes of sensor data, found {}",
                needed,
                data.len()
            )));
        }

        let mut raw: Vec<u16> = try_alloc(
            self.layout.raw_len(),
            "unpacked reader",
            "sensor readout",
            self.layout.raw_width,
            self.layout.raw_height,
        )?;
        for (sample, bytes) in raw.iter_mut().zip(data.chunks_exact(2)) {
            let pair = [bytes[0], bytes[1]];
            *sample = match self.byte_order {
                ByteOrder::Little => u16::from_le_bytes(pair),
                ByteOrder::Big => u16::from_be_bytes(pair),
            };
        }

        let mut metadata = self.metadata.clone();
        if self.black_from_margin {
            if let Some(black) = self.layout.masked_black(&raw) {
                debug!("Black level from masked columns: {}", black);
                metadata.black = black;
            }
        }

        let image = RawImage::from_mosaic(&self.layout, &raw, self.colors, self.cfa)?;
        Ok(RawFrame { image, metadata })
    }
}
