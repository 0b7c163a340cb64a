use tracing::{debug, info};

use crate::image_pipeline::common::config::{PipelineConfig, WhiteBalance};
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::common::{Warning, Warnings};
use crate::image_pipeline::exposure::white_balance;
use crate::image_pipeline::raw::{RawImage, RawMetadata};

/// Scaled values at or above this ceiling use the full 16-bit range.
pub const TARGET_CEILING: u32 = 0x8000;

/// Everything the scaling pass needs, derived once per image.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCorrectionParams {
    pub black: u32,
    /// Final per-channel multipliers, precision shift included.
    pub pre_mul: [f32; 4],
    /// Power of two applied on top of the white balance.
    pub shift: u32,
    /// `(maximum - black) << shift`
    pub ceiling: u32,
    /// Upper clamp for every scaled sample.
    pub clip_max: u16,
}

impl ColorCorrectionParams {
    /// Picks the white balance source, normalizes the multipliers so the
    /// smallest is 1 and folds in the precision shift.
    pub fn derive(
        image: &RawImage,
        metadata: &RawMetadata,
        config: &PipelineConfig,
        warnings: &mut Warnings,
    ) -> Result<Self> {
        let inconsistent = |detail: String| ConversionError::InconsistentMetadata {
            stage: "exposure",
            width: image.width,
            height: image.height,
            detail,
        };

        let black = metadata.black;
        let maximum = metadata.maximum;
        if maximum <= black {
            return Err(inconsistent(format!("maximum {maximum} is not above black {black}")));
        }
        let span = maximum - black;

        for (name, scale) in [("red", config.red_scale), ("blue", config.blue_scale)] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(inconsistent(format!("{name} scale {scale} is not positive")));
            }
        }

        let colors = image.colors;
        let mut pre_mul = if colors == 1 {
            [1.0; 4]
        } else {
            match config.white_balance {
                WhiteBalance::None => [1.0; 4],
                WhiteBalance::Auto => white_balance::gray_world(image, black, maximum, warnings),
                WhiteBalance::Camera => match white_balance::camera(metadata.camera_wb, colors) {
                    Some(wb) => wb,
                    None => {
                        if metadata.camera_wb.is_some() {
                            warnings.push(Warning::CameraWhiteBalanceUnusable);
                        } else {
                            debug!("No camera white balance recorded, using gray world");
                        }
                        white_balance::gray_world(image, black, maximum, warnings)
                    }
                },
                WhiteBalance::Matrix => {
                    match metadata
                        .camera_matrix
                        .as_ref()
                        .and_then(|m| white_balance::from_matrix(m, colors))
                    {
                        Some(wb) => wb,
                        None => {
                            warnings.push(Warning::MatrixWhiteBalanceUnusable);
                            white_balance::gray_world(image, black, maximum, warnings)
                        }
                    }
                }
            }
        };

        if colors >= 3 {
            pre_mul[0] *= config.red_scale;
            pre_mul[2] *= config.blue_scale;
        }

        let min = pre_mul[..colors].iter().copied().fold(f32::INFINITY, f32::min);
        for value in &mut pre_mul[..colors] {
            *value /= min;
        }
        for value in &mut pre_mul[colors..] {
            *value = 1.0;
        }

        let mut shift = 0;
        while (span as u64) << shift < TARGET_CEILING as u64 {
            shift += 1;
        }
        let factor = (1u32 << shift) as f32;
        for value in &mut pre_mul {
            *value *= factor;
        }

        let ceiling = span << shift;
        let clip_max = if config.no_clip {
            u16::MAX
        } else {
            ceiling.min(u16::MAX as u32) as u16
        };

        info!(
            black,
            maximum,
            shift,
            clip_max,
            "Multipliers: {:?}",
            &pre_mul[..colors]
        );

        Ok(Self {
            black,
            pre_mul,
            shift,
            ceiling,
            clip_max,
        })
    }
}
