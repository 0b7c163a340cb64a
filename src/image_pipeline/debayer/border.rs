use crate::image_pipeline::raw::RawImage;

/// Fills the missing channels of every pixel within `border` of the edge with
/// the mean of the same-channel sites in its 3x3 window, clipped to the image.
pub fn border_interpolate(image: &mut RawImage, border: usize) {
    let (width, height, colors) = (image.width, image.height, image.colors);
    for row in 0..height {
        let mut col = 0;
        while col < width {
            if col == border && row >= border && row + border < height && width > 2 * border {
                col = width - border;
                continue;
            }
            let mut sum = [0u32; 4];
            let mut count = [0u32; 4];
            for y in row.saturating_sub(1)..(row + 2).min(height) {
                for x in col.saturating_sub(1)..(col + 2).min(width) {
                    let f = image.cfa.color_at(y, x);
                    sum[f] += image.pixel(y, x)[f] as u32;
                    count[f] += 1;
                }
            }
            let native = image.cfa.color_at(row, col);
            let pixel = image.pixel_mut(row, col);
            for c in 0..colors {
                if c != native && count[c] > 0 {
                    pixel[c] = (sum[c] / count[c]) as u16;
                }
            }
            col += 1;
        }
    }
}
