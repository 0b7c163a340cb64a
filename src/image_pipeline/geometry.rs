//! Geometric normalization
//!
//! Diagonal-sensor resampling and the in-place flip/transpose permutation.

mod diagonal;
mod flip;
mod orientation;


pub use diagonal::rotate_diagonal;
pub use flip::flip_image;
pub use orientation::Orientation;
