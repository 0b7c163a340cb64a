//! RAW image data types

use crate::image_pipeline::common::error::{ConversionError, Result, try_alloc};
use crate::image_pipeline::geometry::Orientation;

/// Color filter array descriptor.
///
/// The pattern is packed into 32 bits: 8 rows by 2 columns, two bits per
/// site, so `(row, col)` maps through `(row mod 8, col mod 2)`. This covers
/// every 2x2 Bayer layout as well as the 4-row CMYG sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfaPattern {
    filters: u32,
}

impl CfaPattern {
    pub const RGGB: CfaPattern = CfaPattern::from_filters(0x9494_9494);
    pub const BGGR: CfaPattern = CfaPattern::from_filters(0x1616_1616);
    pub const GRBG: CfaPattern = CfaPattern::from_filters(0x6161_6161);
    pub const GBRG: CfaPattern = CfaPattern::from_filters(0x4949_4949);
    /// Every site reports channel 0.
    pub const MONOCHROME: CfaPattern = CfaPattern::from_filters(0);

    pub const fn from_filters(filters: u32) -> Self {
        Self { filters }
    }

    /// Builds a pattern by sampling `color` over one 8x2 tile.
    pub fn from_fn(color: impl Fn(usize, usize) -> usize) -> Self {
        let mut filters = 0u32;
        for row in 0..8 {
            for col in 0..2 {
                let shift = ((row << 1) + col) << 1;
                filters |= ((color(row, col) & 3) as u32) << shift;
            }
        }
        Self { filters }
    }

    pub fn filters(&self) -> u32 {
        self.filters
    }

    #[inline(always)]
    pub fn color_at(&self, row: usize, col: usize) -> usize {
        (self.filters >> ((((row << 1) & 14) + (col & 1)) << 1) & 3) as usize
    }

    /// Color at `(row + dy, col + dx)`, where the sum may be negative.
    #[inline]
    pub fn color_at_offset(&self, row: usize, col: usize, dy: isize, dx: isize) -> usize {
        let r = (row as isize + dy).rem_euclid(8) as usize;
        let c = (col as isize + dx).rem_euclid(2) as usize;
        self.color_at(r, c)
    }

    /// Returns the first channel index in the tile that is not below `colors`.
    pub fn first_invalid(&self, colors: usize) -> Option<usize> {
        (0..8)
            .flat_map(|row| (0..2).map(move |col| (row, col)))
            .map(|(row, col)| self.color_at(row, col))
            .find(|&color| color >= colors)
    }

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            CfaPattern::RGGB => Some("RGGB"),
            CfaPattern::BGGR => Some("BGGR"),
            CfaPattern::GRBG => Some("GRBG"),
            CfaPattern::GBRG => Some("GBRG"),
            CfaPattern::MONOCHROME => Some("MONO"),
            _ => None,
        }
    }
}

/// Stride-aware view of the visible sensor area inside the full readout.
///
/// Containers store the sensor as a `raw_width x raw_height` grid; only the
/// `width x height` window starting at (`top_margin`, `left_margin`) holds
/// image data, the rest is masked (optically black) or padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorLayout {
    pub raw_width: usize,
    pub raw_height: usize,
    pub top_margin: usize,
    pub left_margin: usize,
    pub width: usize,
    pub height: usize,
}

impl SensorLayout {
    /// Layout where the whole readout is visible.
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            raw_width: width,
            raw_height: height,
            top_margin: 0,
            left_margin: 0,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConversionError::InvalidDimensions(self.width, self.height));
        }
        if self.top_margin + self.height > self.raw_height
            || self.left_margin + self.width > self.raw_width
        {
            return Err(ConversionError::InconsistentMetadata {
                stage: "sensor layout",
                width: self.width,
                height: self.height,
                detail: format!(
                    "visible area at ({}, {}) exceeds the {}x{} readout",
                    self.left_margin, self.top_margin, self.raw_width, self.raw_height
                ),
            });
        }
        Ok(())
    }

    pub fn raw_len(&self) -> usize {
        self.raw_width * self.raw_height
    }

    /// Index into the readout grid of visible pixel `(row, col)`.
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        (row + self.top_margin) * self.raw_width + col + self.left_margin
    }

    /// Mean of the masked samples that share rows with the visible area, or
    /// `None` when the readout has no masked columns.
    pub fn masked_black(&self, raw: &[u16]) -> Option<u32> {
        if self.raw_width <= self.width {
            return None;
        }
        let mut sum = 0u64;
        let mut count = 0u64;
        for row in self.top_margin..self.top_margin + self.height {
            let line = raw.get(row * self.raw_width..(row + 1) * self.raw_width)?;
            for (col, &value) in line.iter().enumerate() {
                if col < self.left_margin || col >= self.left_margin + self.width {
                    sum += value as u64;
                    count += 1;
                }
            }
        }
        (count > 0).then(|| (sum / count) as u32)
    }
}

/// Sensor image with up to four samples per pixel.
///
/// After loading, each pixel holds only the channel its CFA site measured;
/// the other channels are zero until demosaicing fills them in.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    /// Number of distinct sensor channels: 1, 3 or 4.
    pub colors: usize,
    pub cfa: CfaPattern,
    pub pixels: Vec<[u16; 4]>,
}

impl RawImage {
    pub fn new(width: usize, height: usize, colors: usize, cfa: CfaPattern) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        if !matches!(colors, 1 | 3 | 4) {
            return Err(ConversionError::InconsistentMetadata {
                stage: "raw image",
                width,
                height,
                detail: format!("unsupported channel count {colors}"),
            });
        }
        if let Some(color) = cfa.first_invalid(colors) {
            return Err(ConversionError::InconsistentMetadata {
                stage: "raw image",
                width,
                height,
                detail: format!(
                    "CFA pattern 0x{:08x} references channel {color} but colors={colors}",
                    cfa.filters()
                ),
            });
        }
        let len = width.checked_mul(height).ok_or(ConversionError::ResourceExhausted {
            stage: "raw image",
            width,
            height,
            what: "pixel buffer",
        })?;
        let pixels = try_alloc(len, "raw image", "pixel buffer", width, height)?;
        Ok(Self {
            width,
            height,
            colors,
            cfa,
            pixels,
        })
    }

    /// Copies the visible window of a single-sample-per-site readout into a
    /// new image, placing each sample in the channel its CFA site measures.
    pub fn from_mosaic(
        layout: &SensorLayout,
        raw: &[u16],
        colors: usize,
        cfa: CfaPattern,
    ) -> Result<Self> {
        layout.validate()?;
        if raw.len() < layout.raw_len() {
            return Err(ConversionError::DecodeError(format!(
                "sensor readout holds {} samples, layout needs {}",
                raw.len(),
                layout.raw_len()
            )));
        }
        let mut image = Self::new(layout.width, layout.height, colors, cfa)?;
        for row in 0..layout.height {
            let start = layout.offset(row, 0);
            let line = &raw[start..start + layout.width];
            let out = &mut image.pixels[row * layout.width..(row + 1) * layout.width];
            for (col, (pixel, &value)) in out.iter_mut().zip(line).enumerate() {
                pixel[cfa.color_at(row, col)] = value;
            }
        }
        Ok(image)
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> &[u16; 4] {
        &self.pixels[row * self.width + col]
    }

    #[inline]
    pub fn pixel_mut(&mut self, row: usize, col: usize) -> &mut [u16; 4] {
        &mut self.pixels[row * self.width + col]
    }

    /// The sample the sensor itself recorded at `(row, col)`.
    #[inline]
    pub fn native(&self, row: usize, col: usize) -> u16 {
        self.pixel(row, col)[self.cfa.color_at(row, col)]
    }
}

/// Per-image metadata supplied by the container parser.
#[derive(Debug, Clone)]
pub struct RawMetadata {
    pub make: String,
    pub model: String,
    /// Sensor value for zero light.
    pub black: u32,
    /// Largest value the sensor reports.
    pub maximum: u32,
    /// Camera-recorded white balance multipliers, one per channel.
    pub camera_wb: Option<[f32; 4]>,
    /// Camera-to-RGB matrix, 3 rows by up to 4 sensor channels.
    pub camera_matrix: Option<[[f32; 4]; 3]>,
    pub orientation: Orientation,
    /// Width of the sensor diagonal for 45-degree mounted sensors.
    pub diagonal_width: Option<usize>,
    /// Horizontal and vertical output magnification (pixel aspect).
    pub xmag: usize,
    pub ymag: usize,
    /// Defective photosites as `(col, row)` pairs.
    pub bad_pixels: Vec<(usize, usize)>,
}

impl Default for RawMetadata {
    fn default() -> Self {
        Self {
            make: String::new(),
            model: String::new(),
            black: 0,
            maximum: u16::MAX as u32,
            camera_wb: None,
            camera_matrix: None,
            orientation: Orientation::NORMAL,
            diagonal_width: None,
            xmag: 1,
            ymag: 1,
            bad_pixels: Vec::new(),
        }
    }
}

/// A loaded image together with its metadata.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub image: RawImage,
    pub metadata: RawMetadata,
}
