//! Exposure correction
//!
//! White balance derivation, scaling of the sensor samples into the working
//! 16-bit range, conversion to RGB and rendering of the final output samples.

mod color;
pub mod matrix;
mod params;
mod render;
mod scale;
pub mod white_balance;


pub use color::convert_to_rgb;
pub use matrix::camera_to_rgb;
pub use params::{ColorCorrectionParams, TARGET_CEILING};
pub use render::{gamma_curve, render, white_point};
pub use scale::scale_colors;
