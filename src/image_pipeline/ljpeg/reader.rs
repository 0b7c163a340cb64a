//! Lays decoded lossless JPEG rows out as a sensor mosaic.

use tracing::debug;

use super::decoder::LjpegDecoder;
use crate::image_pipeline::common::error::{ConversionError, Result, try_alloc};
use crate::image_pipeline::raw::{CfaPattern, RawFrame, RawImage, RawImageReader, RawMetadata, SensorLayout};

/// Vertical slicing of the readout: `count` slices of `width` columns
/// followed by one final slice of `last_width` columns. Decoded samples fill
/// each slice top to bottom before moving to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slices {
    pub count: usize,
    pub width: usize,
    pub last_width: usize,
}

/// Reader for sensors whose data is a lossless JPEG stream.
///
/// The decoded samples (`wide * clrs` per JPEG row) are written in order
/// into the `raw_width x raw_height` readout of `layout`, optionally through
/// [`Slices`], and the visible window is cut out afterwards.
#[derive(Debug, Clone)]
pub struct LosslessJpegReader {
    /// `None` treats the decoded frame as the full, unmasked sensor.
    pub layout: Option<SensorLayout>,
    pub slices: Option<Slices>,
    /// Linearization table applied to samples of 12 bits or fewer.
    pub curve: Option<Vec<u16>>,
    pub colors: usize,
    pub cfa: CfaPattern,
    pub metadata: RawMetadata,
    pub black_from_margin: bool,
    /// `0xFF` bytes in the scan are followed by a stuffed `0x00`.
    pub byte_stuffing: bool,
}

impl LosslessJpegReader {
    pub fn new(cfa: CfaPattern, metadata: RawMetadata) -> Self {
        Self {
            layout: None,
            slices: None,
            curve: None,
            colors: 3,
            cfa,
            metadata,
            black_from_margin: false,
            byte_stuffing: true,
        }
    }
}

impl RawImageReader for LosslessJpegReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame> {
        let mut decoder = LjpegDecoder::with_byte_stuffing(data, self.byte_stuffing)?;
        let header = decoder.header().clone();
        let jwide = header.row_len();
        let layout = self
            .layout
            .unwrap_or_else(|| SensorLayout::full(jwide, header.high));
        layout.validate()?;
        debug!(
            "Mapping {}x{} decoded samples into a {}x{} readout",
            jwide, header.high, layout.raw_width, layout.raw_height
        );

        let mut raw: Vec<u16> = try_alloc(
            layout.raw_len(),
            "ljpeg reader",
            "sensor readout",
            layout.raw_width,
            layout.raw_height,
        )?;
        let curve = self.curve.as_deref().filter(|_| header.bits <= 12);

        let (mut row, mut col) = (0usize, 0usize);
        for jrow in 0..header.high {
            let samples = decoder.decode_row()?;
            for (jcol, &sample) in samples.iter().enumerate() {
                let value = match curve {
                    Some(curve) => *curve.get(sample as usize).ok_or_else(|| {
                        ConversionError::InconsistentMetadata {
                            stage: "ljpeg reader",
                            width: layout.width,
                            height: layout.height,
                            detail: format!(
                                "sample {sample} beyond the {}-entry curve",
                                curve.len()
                            ),
                        }
                    })?,
                    None => sample,
                };
                if let Some(slices) = self.slices {
                    (row, col) = slice_position(jrow * jwide + jcol, layout.raw_height, slices);
                }
                if row < layout.raw_height && col < layout.raw_width {
                    raw[row * layout.raw_width + col] = value;
                }
                col += 1;
                if col >= layout.raw_width {
                    col = 0;
                    row += 1;
                }
            }
        }

        let mut metadata = self.metadata.clone();
        if self.black_from_margin {
            if let Some(black) = layout.masked_black(&raw) {
                debug!("Black level from masked columns: {}", black);
                metadata.black = black;
            }
        }
        let image = RawImage::from_mosaic(&layout, &raw, self.colors, self.cfa)?;
        Ok(RawFrame { image, metadata })
    }
}

/// Readout position of the `index`-th decoded sample under slicing.
fn slice_position(index: usize, raw_height: usize, slices: Slices) -> (usize, usize) {
    let slice_len = slices.width * raw_height;
    let mut slice = index / slice_len.max(1);
    let last = slice >= slices.count;
    if last {
        slice = slices.count;
    }
    let within = index - slice * slice_len;
    let width = if last { slices.last_width } else { slices.width };
    let width = width.max(1);
    (within / width, within % width + slice * slices.width)
}
