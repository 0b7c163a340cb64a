use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result, try_alloc};
use crate::image_pipeline::raw::RawImage;

/// Resamples a sensor mounted at 45 degrees onto an axis-aligned grid.
///
/// `diagonal_width` is the extent of the sensor diagonal in source columns.
/// Every output pixel steps `sqrt(0.5)` through the source along both
/// diagonals and interpolates bilinearly over the enclosing 2x2 block; pixels
/// whose source position leaves the image stay black.
pub fn rotate_diagonal(image: &mut RawImage, diagonal_width: usize) -> Result<()> {
    let (width, height) = (image.width, image.height);
    if diagonal_width == 0 || diagonal_width >= height || width < 2 || height < 2 {
        return Err(ConversionError::InconsistentMetadata {
            stage: "diagonal resample",
            width,
            height,
            detail: format!("diagonal width {diagonal_width} does not fit the sensor"),
        });
    }

    let step = 0.5f64.sqrt();
    let wide = (diagonal_width as f64 / step) as usize;
    let high = ((height - diagonal_width) as f64 / step) as usize;
    if wide == 0 || high == 0 {
        return Err(ConversionError::InvalidDimensions(wide, high));
    }
    debug!("Rotating {}x{} sensor by 45 degrees to {}x{}", width, height, wide, high);

    let mut out: Vec<[u16; 4]> = try_alloc(wide * high, "diagonal resample", "output buffer", wide, high)?;
    let colors = image.colors;
    for row in 0..high {
        for col in 0..wide {
            let r = diagonal_width as f64 + (row as f64 - col as f64) * step;
            let c = (row + col) as f64 * step;
            if r < 0.0 || c < 0.0 {
                continue;
            }
            let (ur, uc) = (r as usize, c as usize);
            if ur > height - 2 || uc > width - 2 {
                continue;
            }
            let (fr, fc) = (r - ur as f64, c - uc as f64);
            let top = ur * width + uc;
            let bottom = top + width;
            let target = &mut out[row * wide + col];
            for i in 0..colors {
                let p = &image.pixels;
                let value = (p[top][i] as f64 * (1.0 - fc) + p[top + 1][i] as f64 * fc) * (1.0 - fr)
                    + (p[bottom][i] as f64 * (1.0 - fc) + p[bottom + 1][i] as f64 * fc) * fr;
                target[i] = value as u16;
            }
        }
    }

    image.width = wide;
    image.height = high;
    image.pixels = out;
    Ok(())
}
