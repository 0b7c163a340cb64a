use crate::image_pipeline::exposure::ColorCorrectionParams;
use crate::image_pipeline::raw::RawImage;

/// Subtracts black, applies the multipliers and clamps to `clip_max`.
/// Zero samples are channels the sensor did not record and stay zero.
pub fn scale_colors(image: &mut RawImage, params: &ColorCorrectionParams) {
    let colors = image.colors;
    let black = params.black as f32;
    let clip = params.clip_max as f32;
    for pixel in image.pixels.iter_mut() {
        for (sample, &mul) in pixel[..colors].iter_mut().zip(&params.pre_mul) {
            if *sample == 0 {
                continue;
            }
            let value = (*sample as f32 - black) * mul;
            *sample = value.clamp(0.0, clip) as u16;
        }
    }
}
