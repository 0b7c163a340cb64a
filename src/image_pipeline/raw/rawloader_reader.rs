//! RAW image reader implementation using the rawloader library.
//!
//! This module provides support for reading various RAW image formats (ARW, CR2, NEF, DNG, etc.)
//! using the rawloader library. It decodes the sensor data and translates rawloader's
//! metadata (CFA, levels, white balance, color matrix, crops, orientation) into a [`RawFrame`].

use std::io::Cursor;

use rawloader::RawImageData as RawloaderImageData;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::exposure::camera_to_rgb;
use crate::image_pipeline::geometry::Orientation;
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{CfaPattern, RawFrame, RawImage, RawMetadata, SensorLayout};

/// RAW image reader that uses the rawloader library for decoding.
///
/// Only sensors whose CFA repeats within 8 rows and 2 columns are accepted;
/// X-Trans and multi-sample-per-pixel data is rejected as unsupported.
pub struct RawLoaderReader;

impl RawLoaderReader {
    fn cfa_pattern(cfa: &rawloader::CFA, top: usize, left: usize) -> Result<(CfaPattern, usize)> {
        if cfa.name.is_empty() {
            return Ok((CfaPattern::MONOCHROME, 1));
        }
        for row in 0..8 {
            for col in 0..2 {
                let color = cfa.color_at(row + top, col + left);
                let repeats = (0..3).all(|k| cfa.color_at(row + top + 8 * k, col + left + 2 * k) == color);
                if !repeats || color > 3 {
                    return Err(ConversionError::UnsupportedFormat(format!(
                        "CFA layout {} does not repeat on an 8x2 tile",
                        cfa.name
                    )));
                }
            }
        }
        let pattern = CfaPattern::from_fn(|row, col| cfa.color_at(row + top, col + left));
        let highest = (0..8)
            .flat_map(|row| (0..2).map(move |col| (row, col)))
            .map(|(row, col)| pattern.color_at(row, col))
            .max()
            .unwrap_or(0);
        let colors = match highest {
            0 => 1,
            3 => 4,
            _ => 3,
        };
        Ok((pattern, colors))
    }

    /// Camera-to-RGB matrix from rawloader's XYZ-to-camera coefficients.
    pub(crate) fn color_matrix(xyz_to_cam: &[[f32; 3]; 4], colors: usize) -> Option<[[f32; 4]; 3]> {
        let matrix = camera_to_rgb(xyz_to_cam, colors);
        if matrix.is_none() && colors > 1 {
            debug!("No usable color matrix, keeping camera primaries");
        }
        matrix
    }

    fn orientation(orientation: &rawloader::Orientation) -> Orientation {
        match orientation {
            rawloader::Orientation::HorizontalFlip => Orientation::FLIP_COLUMNS,
            rawloader::Orientation::VerticalFlip => Orientation::FLIP_ROWS,
            rawloader::Orientation::Rotate180 => Orientation::ROTATE_180,
            rawloader::Orientation::Transpose => Orientation::TRANSPOSE,
            rawloader::Orientation::Rotate90 => Orientation::ROTATE_90,
            rawloader::Orientation::Rotate270 => Orientation::ROTATE_270,
            rawloader::Orientation::Transverse => Orientation::TRANSVERSE,
            _ => Orientation::NORMAL,
        }
    }
}

impl RawImageReader for RawLoaderReader {
    /// Decodes a camera file with rawloader and maps it onto the pipeline's frame.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rawdev::image_pipeline::{RawImageReader, RawLoaderReader};
    ///
    /// let raw_bytes = std::fs::read("image.arw").unwrap();
    /// let frame = RawLoaderReader.read_raw(&raw_bytes).unwrap();
    /// println!("{}x{}", frame.image.width, frame.image.height);
    /// ```
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        if decoded.cpp != 1 {
            return Err(ConversionError::UnsupportedFormat(format!(
                "{} samples per pixel",
                decoded.cpp
            )));
        }

        let raw_width = decoded.width;
        let raw_height = decoded.height;
        debug!("Decoded image: {}x{} ({} {})", raw_width, raw_height, decoded.clean_make, decoded.clean_model);

        // Float data is normalized 0.0-1.0; scale it to the u16 range
        let raw: Vec<u16> = match decoded.data {
            RawloaderImageData::Integer(values) => values,
            RawloaderImageData::Float(values) => values
                .iter()
                .map(|&v| (v * u16::MAX as f32).clamp(0.0, u16::MAX as f32) as u16)
                .collect(),
        };

        // crops are [top, right, bottom, left]
        let [top, right, bottom, left] = decoded.crops;
        let layout = SensorLayout {
            raw_width,
            raw_height,
            top_margin: top,
            left_margin: left,
            width: raw_width.saturating_sub(left + right),
            height: raw_height.saturating_sub(top + bottom),
        };

        let (cfa, colors) = Self::cfa_pattern(&decoded.cfa, top, left)?;
        debug!("CFA {} -> 0x{:08x}, {} colors", decoded.cfa.name, cfa.filters(), colors);

        let wb = decoded.wb_coeffs;
        let camera_wb = if wb[..colors.min(3)].iter().all(|v| v.is_finite() && *v > 0.0) {
            let fourth = if wb[3].is_finite() && wb[3] > 0.0 { wb[3] } else { wb[1] };
            Some([wb[0], wb[1], wb[2], fourth])
        } else {
            None
        };

        let metadata = RawMetadata {
            make: decoded.clean_make.clone(),
            model: decoded.clean_model.clone(),
            black: decoded.blacklevels[0] as u32,
            maximum: decoded.whitelevels.iter().max().copied().unwrap_or(u16::MAX) as u32,
            camera_wb,
            camera_matrix: Self::color_matrix(&decoded.xyz_to_cam, colors),
            orientation: Self::orientation(&decoded.orientation),
            ..RawMetadata::default()
        };

        let image = RawImage::from_mosaic(&layout, &raw, colors, cfa)?;
        Ok(RawFrame { image, metadata })
    }
}
