use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use rawdev::image_pipeline::{
    CfaPattern, LjpegDecoder, LosslessJpegReader, PipelineConfig, RawImageReader, RawMetadata,
    RawToTiffPipeline, StandardTiffWriter, TiffCompression, TiffWriter, Warnings,
};
use rawdev::logger;

use tracing::{info, warn};

const USAGE: &str = "usage: rawdev <input> <output.tiff> [--format raw|ljpeg]";

enum InputFormat {
    /// Camera files decoded with rawloader.
    Raw,
    /// A bare lossless JPEG sensor stream, RGGB.
    Ljpeg,
}

fn parse_args() -> anyhow::Result<(PathBuf, PathBuf, InputFormat)> {
    let mut positional = Vec::new();
    let mut format = InputFormat::Raw;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--format" {
            format = match args.next().as_deref() {
                Some("raw") => InputFormat::Raw,
                Some("ljpeg") => InputFormat::Ljpeg,
                other => bail!("unknown format {:?}\n{}", other, USAGE),
            };
        } else {
            positional.push(PathBuf::from(arg));
        }
    }
    match <[PathBuf; 2]>::try_from(positional) {
        Ok([input, output]) => Ok((input, output, format)),
        Err(_) => bail!(USAGE),
    }
}

fn write_output<R: RawImageReader, W: TiffWriter>(
    pipeline: &RawToTiffPipeline<R, W>,
    data: &[u8],
    output: &Path,
) -> anyhow::Result<Warnings> {
    let mut file = std::fs::File::create(output)
        .with_context(|| format!("creating {}", output.display()))?;
    let (warnings, timings) = pipeline.convert_with_timings(data, &mut file)?;
    timings.log_summary();
    Ok(warnings)
}

fn main() -> anyhow::Result<()> {
    logger::init();

    let (input, output, format) = parse_args()?;

    let config = PipelineConfig::builder()
        .compression(TiffCompression::None)
        .build();
    info!("Compression: {:?}", config.compression);

    let data = std::fs::read(&input).with_context(|| format!("reading {}", input.display()))?;

    let warnings = match format {
        InputFormat::Raw => write_output(&RawToTiffPipeline::new(config), &data, &output),
        InputFormat::Ljpeg => {
            let bits = LjpegDecoder::new(&data)?.header().bits;
            let metadata = RawMetadata {
                maximum: (1u32 << bits) - 1,
                ..RawMetadata::default()
            };
            let reader = LosslessJpegReader::new(CfaPattern::RGGB, metadata);
            let pipeline = RawToTiffPipeline::with_custom(reader, StandardTiffWriter, config);
            write_output(&pipeline, &data, &output)
        }
    }
    .with_context(|| format!("converting {}", input.display()))?;

    if !warnings.is_empty() {
        warn!("{} warning(s) while developing {}", warnings.len(), input.display());
    }
    info!("Wrote {}", output.display());
    Ok(())
}
