//! Demosaicing module for reconstructing full-color pixels from a CFA mosaic

mod bilinear;
mod border;
pub mod cpu_debayer;
mod vng;


pub use bilinear::bilinear_seed;
pub use border::border_interpolate;
pub use cpu_debayer::CpuDebayer;
pub use vng::vng_refine;
