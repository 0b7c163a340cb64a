//! Stage driver turning a loaded raw frame into output samples.

use tracing::{debug, info, info_span};

use crate::image_pipeline::common::config::PipelineConfig;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::Warnings;
use crate::image_pipeline::conversions::timing::{PipelineTimings, Timer};
use crate::image_pipeline::debayer::CpuDebayer;
use crate::image_pipeline::exposure::{self, ColorCorrectionParams};
use crate::image_pipeline::geometry::{flip_image, rotate_diagonal};
use crate::image_pipeline::raw::{RawFrame, RawImage, RawMetadata, fix_bad_pixels};
use crate::image_pipeline::tiff::RgbImageData;

/// State shared by the development stages of one image.
#[derive(Debug)]
pub struct DevelopContext {
    pub image: RawImage,
    pub metadata: RawMetadata,
    pub warnings: Warnings,
    pub xmag: usize,
    pub ymag: usize,
}

impl DevelopContext {
    pub fn new(frame: RawFrame) -> Self {
        let xmag = frame.metadata.xmag;
        let ymag = frame.metadata.ymag;
        Self {
            image: frame.image,
            metadata: frame.metadata,
            warnings: Warnings::new(),
            xmag,
            ymag,
        }
    }
}

/// Output of [`develop`].
#[derive(Debug)]
pub struct DevelopedImage {
    pub rgb: RgbImageData,
    pub params: ColorCorrectionParams,
    pub warnings: Warnings,
}

pub fn develop(frame: RawFrame, config: &PipelineConfig) -> Result<DevelopedImage> {
    run(DevelopContext::new(frame), config, None)
}

pub fn develop_with_timings(
    frame: RawFrame,
    config: &PipelineConfig,
    timings: &mut PipelineTimings,
) -> Result<DevelopedImage> {
    run(DevelopContext::new(frame), config, Some(timings))
}

fn stage<T>(
    name: &'static str,
    timings: &mut Option<&mut PipelineTimings>,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let _span = info_span!("stage", name).entered();
    let timer = Timer::start(name);
    let out = f()?;
    if let Some(timings) = timings.as_deref_mut() {
        timings.record(timer);
    }
    Ok(out)
}

fn run(
    mut ctx: DevelopContext,
    config: &PipelineConfig,
    mut timings: Option<&mut PipelineTimings>,
) -> Result<DevelopedImage> {
    info!(
        width = ctx.image.width,
        height = ctx.image.height,
        colors = ctx.image.colors,
        "Developing {} {}",
        ctx.metadata.make,
        ctx.metadata.model
    );

    if !ctx.metadata.bad_pixels.is_empty() {
        stage("bad_pixels", &mut timings, || {
            fix_bad_pixels(&mut ctx.image, &ctx.metadata.bad_pixels, &mut ctx.warnings);
            Ok(())
        })?;
    }

    let params = stage("scale_colors", &mut timings, || {
        let params = ColorCorrectionParams::derive(&ctx.image, &ctx.metadata, config, &mut ctx.warnings)?;
        exposure::scale_colors(&mut ctx.image, &params);
        Ok(params)
    })?;

    stage("demosaic", &mut timings, || {
        CpuDebayer::new(config).process(&mut ctx.image, params.clip_max)
    })?;

    stage("convert_to_rgb", &mut timings, || {
        let matrix = ctx.metadata.camera_matrix.as_ref().filter(|_| config.use_color_matrix);
        exposure::convert_to_rgb(&mut ctx.image, matrix, params.clip_max);
        Ok(())
    })?;

    if let Some(diagonal_width) = ctx.metadata.diagonal_width {
        stage("rotate_diagonal", &mut timings, || rotate_diagonal(&mut ctx.image, diagonal_width))?;
    }

    if !ctx.metadata.orientation.is_identity() {
        stage("flip", &mut timings, || {
            flip_image(&mut ctx.image, ctx.metadata.orientation, &mut ctx.xmag, &mut ctx.ymag)
        })?;
    }

    let rgb = stage("render", &mut timings, || {
        exposure::render(&ctx.image, ctx.xmag, ctx.ymag, params.clip_max, config)
    })?;

    debug!(warnings = ctx.warnings.len(), "Development finished");
    Ok(DevelopedImage {
        rgb,
        params,
        warnings: ctx.warnings,
    })
}
