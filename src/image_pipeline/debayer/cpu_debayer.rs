use tracing::{debug, info};

use crate::image_pipeline::common::config::PipelineConfig;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::debayer::{bilinear_seed, border_interpolate, vng_refine};
use crate::image_pipeline::raw::RawImage;

/// Demosaics a CFA image in place: border fill, bilinear seed, then VNG
/// refinement unless quick interpolation is requested.
#[derive(Debug, Clone, Copy)]
pub struct CpuDebayer {
    pub quick: bool,
    pub fill_border: bool,
}

impl CpuDebayer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            quick: config.quick_interpolate,
            fill_border: config.fill_border,
        }
    }

    pub fn process(&self, image: &mut RawImage, clip_max: u16) -> Result<()> {
        if image.colors == 1 {
            debug!("Monochrome sensor, nothing to demosaic");
            return Ok(());
        }
        info!(
            "Starting CPU demosaic for image {}x{} ({} colors, {})",
            image.width,
            image.height,
            image.colors,
            if self.quick { "bilinear" } else { "VNG" }
        );
        if self.fill_border {
            border_interpolate(image, 1);
        }
        bilinear_seed(image);
        if !self.quick {
            vng_refine(image, clip_max)?;
        }
        Ok(())
    }
}
