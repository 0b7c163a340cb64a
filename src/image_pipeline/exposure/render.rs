use tracing::debug;

use crate::image_pipeline::common::config::PipelineConfig;
use crate::image_pipeline::common::error::{ConversionError, Result, try_alloc};
use crate::image_pipeline::raw::RawImage;
use crate::image_pipeline::tiff::RgbImageData;

const HISTOGRAM_BINS: usize = 0x2000;
/// Lowest histogram bin the white point search may stop at.
const WHITE_FLOOR: usize = 32;

/// ITU-R BT.709 transfer curve on a linear value in `0.0..`.
fn bt709(r: f64) -> f64 {
    if r <= 0.018 {
        r * 4.5
    } else {
        r.powf(0.45) * 1.099 - 0.099
    }
}

/// Sample value that 99% of each channel's samples stay below, maximized over
/// the three channels.
pub fn white_point(image: &RawImage) -> usize {
    let mut histogram = vec![[0u32; 3]; HISTOGRAM_BINS];
    for pixel in &image.pixels {
        for c in 0..3 {
            histogram[(pixel[c] >> 3) as usize][c] += 1;
        }
    }
    let perc = (image.width * image.height) as f64 * 0.01;
    let mut white = 0;
    for c in 0..3 {
        let mut total = 0u64;
        let mut val = HISTOGRAM_BINS - 1;
        while val > WHITE_FLOOR {
            total += histogram[val][c] as u64;
            if total as f64 > perc {
                break;
            }
            val -= 1;
        }
        white = white.max(val);
    }
    white << 3
}

/// Builds the 16-bit to 8-bit lookup for gamma output.
pub fn gamma_curve(white: f64) -> Vec<u8> {
    (0..=u16::MAX as u32)
        .map(|i| {
            let value = (256.0 * bt709(i as f64 / white)) as i64;
            value.clamp(0, 255) as u8
        })
        .collect()
}

/// Produces the interleaved RGB output of a three-channel image.
///
/// Linear output keeps the samples as they are with `maxval = clip_max`;
/// otherwise samples are mapped through the BT.709 curve with the white point
/// at the 99th percentile, scaled by the configured brightness, and
/// `maxval = 255`. Each pixel is repeated `xmag` times across and `ymag` times
/// down.
pub fn render(
    image: &RawImage,
    xmag: usize,
    ymag: usize,
    clip_max: u16,
    config: &PipelineConfig,
) -> Result<RgbImageData> {
    let inconsistent = |detail: String| ConversionError::InconsistentMetadata {
        stage: "render",
        width: image.width,
        height: image.height,
        detail,
    };
    if xmag == 0 || ymag == 0 {
        return Err(inconsistent(format!("magnification {xmag}x{ymag}")));
    }
    if image.colors != 3 {
        return Err(inconsistent(format!("{} channels, expected 3", image.colors)));
    }

    let (lut, maxval) = if config.linear_output {
        (None, clip_max)
    } else {
        if !(config.brightness.is_finite() && config.brightness > 0.0) {
            return Err(inconsistent(format!("brightness {}", config.brightness)));
        }
        let white = white_point(image) as f64 / config.brightness as f64;
        debug!(white, "Gamma white point");
        (Some(gamma_curve(white)), u8::MAX as u16)
    };

    let width = image.width * xmag;
    let height = image.height * ymag;
    let len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(3))
        .ok_or(ConversionError::ResourceExhausted {
            stage: "render",
            width,
            height,
            what: "output buffer",
        })?;
    let mut data: Vec<u16> = try_alloc(len, "render", "output buffer", width, height)?;

    let map = |v: u16| match &lut {
        Some(lut) => lut[v as usize] as u16,
        None => v,
    };
    for row in 0..image.height {
        let line = &mut data[row * ymag * width * 3..(row * ymag + 1) * width * 3];
        for col in 0..image.width {
            let pixel = image.pixel(row, col);
            let rgb = [map(pixel[0]), map(pixel[1]), map(pixel[2])];
            for x in 0..xmag {
                let at = (col * xmag + x) * 3;
                line[at..at + 3].copy_from_slice(&rgb);
            }
        }
        for y in 1..ymag {
            let (head, tail) = data.split_at_mut((row * ymag + y) * width * 3);
            let first = &head[row * ymag * width * 3..(row * ymag + 1) * width * 3];
            tail[..width * 3].copy_from_slice(first);
        }
    }

    Ok(RgbImageData {
        width,
        height,
        data,
        maxval,
    })
}
