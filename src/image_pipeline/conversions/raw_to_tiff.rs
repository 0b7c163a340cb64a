use tracing::{info, instrument, warn};
use std::io::Write;
use std::path::Path;

use crate::image_pipeline::{
    common::config::PipelineConfig,
    common::error::{ConversionError, Result},
    common::Warnings,
    conversions::develop::{develop, develop_with_timings},
    conversions::timing::{PipelineTimings, Timer},
    raw::{RawImageReader, RawLoaderReader},
    tiff::{TiffWriter, StandardTiffWriter},
};

pub struct RawToTiffPipeline<R: RawImageReader, W: TiffWriter> {
    reader: R,
    writer: W,
    config: PipelineConfig,
}

impl RawToTiffPipeline<RawLoaderReader, StandardTiffWriter> {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            reader: RawLoaderReader,
            writer: StandardTiffWriter,
            config,
        }
    }
}

impl<R: RawImageReader, W: TiffWriter> RawToTiffPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: PipelineConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                warn!("Image dimensions {}x{} exceed maximum {}", width, height, max);
                return Err(ConversionError::InvalidDimensions(width, height));
            }
        }

        Ok(())
    }

    /// Decodes, develops and writes one image. Non-fatal conditions met on
    /// the way are returned.
    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<Warnings> {
        self.run(input_data, output, None)
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert_with_timings(
        &self,
        input_data: &[u8],
        output: &mut dyn Write,
    ) -> Result<(Warnings, PipelineTimings)> {
        let mut timings = PipelineTimings::new();
        let warnings = self.run(input_data, output, Some(&mut timings))?;
        Ok((warnings, timings))
    }

    fn run(
        &self,
        input_data: &[u8],
        output: &mut dyn Write,
        mut timings: Option<&mut PipelineTimings>,
    ) -> Result<Warnings> {
        info!("Starting RAW to TIFF conversion");

        let frame = {
            let _span = tracing::info_span!("decode_raw").entered();
            let timer = Timer::start("decode_raw");
            let frame = self.reader.read_raw(input_data)?;
            if let Some(timings) = timings.as_deref_mut() {
                timings.record(timer);
            }
            frame
        };

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = frame.image.width,
                height = frame.image.height
            ).entered();
            self.validate_dimensions(frame.image.width, frame.image.height)?;
        }

        let developed = match timings.as_deref_mut() {
            Some(timings) => develop_with_timings(frame, &self.config, timings)?,
            None => develop(frame, &self.config)?,
        };

        {
            let _span = tracing::info_span!("encode_tiff").entered();
            let timer = Timer::start("encode_tiff");
            self.writer.write_tiff(&developed.rgb, output, &self.config)?;
            if let Some(timings) = timings.as_deref_mut() {
                timings.record(timer);
            }
        }

        info!(
            width = developed.rgb.width,
            height = developed.rgb.height,
            warnings = developed.warnings.len(),
            "Conversion complete"
        );
        Ok(developed.warnings)
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<Warnings> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                ConversionError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let mut output_file = {
            let _span = tracing::info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                ConversionError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };

        self.convert(&input_data, &mut output_file)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }
}
