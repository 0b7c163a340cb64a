//! Replaces known-defective photosites before any other processing.

use tracing::debug;

use crate::image_pipeline::common::{Warning, Warnings};
use crate::image_pipeline::raw::types::RawImage;

/// Replaces each listed `(col, row)` site with the mean of the same-color
/// sites around it, searching radius 1 first and radius 2 if that finds none.
/// Coordinates outside the image are ignored.
pub fn fix_bad_pixels(image: &mut RawImage, bad: &[(usize, usize)], warnings: &mut Warnings) {
    let (width, height) = (image.width as isize, image.height as isize);
    let mut fixed = 0usize;
    for &(col, row) in bad {
        if col >= image.width || row >= image.height {
            continue;
        }
        let color = image.cfa.color_at(row, col);
        let (fr, fc) = (row as isize, col as isize);
        let mut total = 0u32;
        let mut count = 0u32;
        for rad in 1..3isize {
            for y in fr - rad..=fr + rad {
                for x in fc - rad..=fc + rad {
                    if y < 0 || y >= height || x < 0 || x >= width || (y == fr && x == fc) {
                        continue;
                    }
                    let (y, x) = (y as usize, x as usize);
                    if image.cfa.color_at(y, x) == color {
                        total += image.pixel(y, x)[color] as u32;
                        count += 1;
                    }
                }
            }
            if count > 0 {
                break;
            }
        }
        if count == 0 {
            warnings.push(Warning::BadPixelUnrecoverable { col, row });
            continue;
        }
        image.pixel_mut(row, col)[color] = (total / count) as u16;
        fixed += 1;
    }
    debug!("Fixed {} of {} listed bad pixels", fixed, bad.len());
}
