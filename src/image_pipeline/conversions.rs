//! Pipeline conversions module
//!
//! This module contains the development stage driver and the orchestration
//! of RAW to TIFF conversion.

mod develop;
mod raw_to_tiff;
mod timing;


pub use develop::{DevelopContext, DevelopedImage, develop, develop_with_timings};
pub use raw_to_tiff::RawToTiffPipeline;
pub use timing::{PipelineTimings, StepTiming, Timer};
