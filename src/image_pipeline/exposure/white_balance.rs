//! Per-channel white balance multipliers.

use tracing::debug;

use crate::image_pipeline::common::{Warning, Warnings};
use crate::image_pipeline::exposure::matrix::invert3;
use crate::image_pipeline::raw::RawImage;

/// Samples within this many levels of the ceiling are left out of the
/// gray-world statistics.
pub const HEADROOM: u32 = 25;

/// Gray-world multipliers: each channel is scaled so its mean matches the
/// reference channel's (green when present).
///
/// Only each pixel's native sample is counted. Zero samples and samples
/// within [`HEADROOM`] of `maximum` are skipped. A channel without usable
/// samples gets a neutral 1.0 and a [`Warning::ZeroChannelSum`].
pub fn gray_world(image: &RawImage, black: u32, maximum: u32, warnings: &mut Warnings) -> [f32; 4] {
    let span = maximum.saturating_sub(black);
    let limit = span.saturating_sub(HEADROOM);
    let mut sum = [0u64; 4];
    let mut count = [0u64; 4];

    for row in 0..image.height {
        for col in 0..image.width {
            let color = image.cfa.color_at(row, col);
            let value = image.pixel(row, col)[color] as u32;
            if value == 0 {
                continue;
            }
            let value = value.saturating_sub(black);
            if value > limit {
                continue;
            }
            sum[color] += value as u64;
            count[color] += 1;
        }
    }

    let mean = |c: usize| (sum[c] > 0).then(|| sum[c] as f64 / count[c] as f64);
    let reference = if image.colors > 1 && mean(1).is_some() {
        Some(1)
    } else {
        (0..image.colors).find(|&c| mean(c).is_some())
    };

    let mut pre_mul = [1.0f32; 4];
    for c in 0..image.colors {
        match (mean(c), reference.and_then(mean)) {
            (Some(avg), Some(ref_avg)) => pre_mul[c] = (ref_avg / avg) as f32,
            _ => warnings.push(Warning::ZeroChannelSum { channel: c }),
        }
    }
    debug!(?sum, ?count, ?pre_mul, "Gray-world statistics");
    pre_mul
}

/// Camera multipliers, if every channel in use is finite and positive.
pub fn camera(camera_wb: Option<[f32; 4]>, colors: usize) -> Option<[f32; 4]> {
    let wb = camera_wb?;
    wb[..colors]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
        .then_some(wb)
}

/// Daylight multipliers implied by a camera-to-RGB matrix.
///
/// Solves for the minimum-norm sensor response `x` with `matrix * x = 1`
/// (white maps to white) and returns `1 / x`. Returns `None` if the
/// system is singular or any response is not positive.
pub fn from_matrix(matrix: &[[f32; 4]; 3], colors: usize) -> Option<[f32; 4]> {
    if colors < 3 {
        return None;
    }
    // x = A^T (A A^T)^-1 * 1
    let mut gram = [[0f64; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            gram[i][j] = (0..colors).map(|k| matrix[i][k] as f64 * matrix[j][k] as f64).sum();
        }
    }
    let inverse = invert3(&gram)?;
    let y: Vec<f64> = (0..3).map(|i| inverse[i].iter().sum()).collect();

    let mut pre_mul = [1.0f32; 4];
    for k in 0..colors {
        let response: f64 = (0..3).map(|i| matrix[i][k] as f64 * y[i]).sum();
        if !(response.is_finite() && response > 1e-9) {
            return None;
        }
        pre_mul[k] = (1.0 / response) as f32;
    }
    Some(pre_mul)
}
