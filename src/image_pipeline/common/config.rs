//! Pipeline configuration

use crate::image_pipeline::tiff::types::TiffCompression;

/// Where the per-channel white balance multipliers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteBalance {
    /// Camera-recorded multipliers; gray world if the camera recorded none.
    Camera,
    /// Gray-world statistics of the image itself.
    Auto,
    /// Daylight balance implied by the camera color matrix.
    Matrix,
    /// All multipliers 1.
    None,
}

/// Configuration for developing a RAW frame and writing it as TIFF
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Compression method to use
    pub compression: TiffCompression,
    /// Predictor value for compression (typically 2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Whether to validate image dimensions before conversion
    pub validate_dimensions: bool,
    /// Largest accepted width or height when validating
    pub max_dimension: Option<usize>,
    /// Bilinear interpolation only, skipping the VNG pass
    pub quick_interpolate: bool,
    /// Fill the edge pixels the bilinear pass leaves untouched
    pub fill_border: bool,
    /// Clip at 0xffff instead of the scaled sensor ceiling
    pub no_clip: bool,
    /// 16-bit linear output instead of 8-bit gamma-encoded output
    pub linear_output: bool,
    /// White point scale for gamma output
    pub brightness: f32,
    pub white_balance: WhiteBalance,
    /// Extra multiplier for the red channel
    pub red_scale: f32,
    /// Extra multiplier for the blue channel
    pub blue_scale: f32,
    /// Convert through the camera color matrix when the metadata has one
    pub use_color_matrix: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
            validate_dimensions: true,
            max_dimension: Some(u16::MAX as usize),
            quick_interpolate: false,
            fill_border: true,
            no_clip: false,
            linear_output: false,
            brightness: 1.0,
            white_balance: WhiteBalance::Camera,
            red_scale: 1.0,
            blue_scale: 1.0,
            use_color_matrix: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<usize>>,
    quick_interpolate: Option<bool>,
    fill_border: Option<bool>,
    no_clip: Option<bool>,
    linear_output: Option<bool>,
    brightness: Option<f32>,
    white_balance: Option<WhiteBalance>,
    red_scale: Option<f32>,
    blue_scale: Option<f32>,
    use_color_matrix: Option<bool>,
}

impl PipelineConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max: Option<usize>) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn quick_interpolate(mut self, quick: bool) -> Self {
        self.quick_interpolate = Some(quick);
        self
    }

    pub fn fill_border(mut self, fill: bool) -> Self {
        self.fill_border = Some(fill);
        self
    }

    pub fn no_clip(mut self, no_clip: bool) -> Self {
        self.no_clip = Some(no_clip);
        self
    }

    pub fn linear_output(mut self, linear: bool) -> Self {
        self.linear_output = Some(linear);
        self
    }

    pub fn brightness(mut self, brightness: f32) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn white_balance(mut self, white_balance: WhiteBalance) -> Self {
        self.white_balance = Some(white_balance);
        self
    }

    pub fn red_scale(mut self, scale: f32) -> Self {
        self.red_scale = Some(scale);
        self
    }

    pub fn blue_scale(mut self, scale: f32) -> Self {
        self.blue_scale = Some(scale);
        self
    }

    pub fn use_color_matrix(mut self, enable: bool) -> Self {
        self.use_color_matrix = Some(enable);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
            quick_interpolate: self.quick_interpolate.unwrap_or(default.quick_interpolate),
            fill_border: self.fill_border.unwrap_or(default.fill_border),
            no_clip: self.no_clip.unwrap_or(default.no_clip),
            linear_output: self.linear_output.unwrap_or(default.linear_output),
            brightness: self.brightness.unwrap_or(default.brightness),
            white_balance: self.white_balance.unwrap_or(default.white_balance),
            red_scale: self.red_scale.unwrap_or(default.red_scale),
            blue_scale: self.blue_scale.unwrap_or(default.blue_scale),
            use_color_matrix: self.use_color_matrix.unwrap_or(default.use_color_matrix),
        }
    }
}
