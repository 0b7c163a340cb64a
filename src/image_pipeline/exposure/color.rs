use tracing::debug;

use crate::image_pipeline::raw::RawImage;

/// Converts sensor channels to three display channels in place.
///
/// Monochrome data is replicated, a matrix (3 rows, one column per sensor
/// channel) is applied as a dot product per pixel, and four-channel data
/// without a matrix has its two greens averaged. Matrix output is clamped to
/// `[0, clip_max]`. The image has three colors afterwards.
pub fn convert_to_rgb(image: &mut RawImage, matrix: Option<&[[f32; 4]; 3]>, clip_max: u16) {
    let colors = image.colors;
    match (colors, matrix) {
        (1, _) => {
            debug!("Replicating monochrome channel");
            for pixel in image.pixels.iter_mut() {
                pixel[1] = pixel[0];
                pixel[2] = pixel[0];
            }
        }
        (_, Some(matrix)) => {
            debug!("Applying {}x3 color matrix", colors);
            for pixel in image.pixels.iter_mut() {
                let mut out = [0u16; 4];
                for (channel, row) in out.iter_mut().zip(matrix) {
                    let value: f32 = row[..colors]
                        .iter()
                        .zip(&pixel[..colors])
                        .map(|(&m, &v)| m * v as f32)
                        .sum();
                    *channel = value.clamp(0.0, clip_max as f32) as u16;
                }
                *pixel = out;
            }
        }
        (4, None) => {
            debug!("Merging the two green channels");
            for pixel in image.pixels.iter_mut() {
                pixel[1] = ((pixel[1] as u32 + pixel[3] as u32) / 2) as u16;
                pixel[3] = 0;
            }
        }
        _ => {}
    }
    image.colors = 3;
}
