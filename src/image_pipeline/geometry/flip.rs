use tracing::debug;

use crate::image_pipeline::common::error::{Result, try_alloc};
use crate::image_pipeline::geometry::Orientation;
use crate::image_pipeline::raw::RawImage;

/// Where the pixel landing at `dest` of the reoriented image comes from.
#[inline]
fn source_index(dest: usize, width: usize, height: usize, orientation: Orientation) -> usize {
    let (mut row, mut col) = if orientation.transposes() {
        (dest % height, dest / height)
    } else {
        (dest / width, dest % width)
    };
    if orientation.flips_rows() {
        row = height - 1 - row;
    }
    if orientation.flips_columns() {
        col = width - 1 - col;
    }
    row * width + col
}

/// Reorients the image in place by following permutation cycles.
///
/// A bitmap of `ceil(pixels / 32)` words marks positions already written, so
/// the only extra allocation is that bitmap. A transpose swaps `width` with
/// `height` and `xmag` with `ymag`.
pub fn flip_image(
    image: &mut RawImage,
    orientation: Orientation,
    xmag: &mut usize,
    ymag: &mut usize,
) -> Result<()> {
    if orientation.is_identity() {
        return Ok(());
    }
    let (width, height) = (image.width, image.height);
    let size = width * height;
    debug!("Reorienting {}x{} image with code {}", width, height, orientation.code());

    let mut visited: Vec<u32> = try_alloc((size + 31) >> 5, "flip", "visited bitmap", width, height)?;
    let pixels = &mut image.pixels;
    for base in 0..size {
        if visited[base >> 5] & (1 << (base & 31)) != 0 {
            continue;
        }
        let hold = pixels[base];
        let mut dest = base;
        loop {
            let next = source_index(dest, width, height, orientation);
            if next == base {
                break;
            }
            visited[next >> 5] |= 1 << (next & 31);
            pixels[dest] = pixels[next];
            dest = next;
        }
        pixels[dest] = hold;
    }

    if orientation.transposes() {
        std::mem::swap(&mut image.width, &mut image.height);
        std::mem::swap(xmag, ymag);
    }
    Ok(())
}
