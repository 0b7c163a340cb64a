//! Common utilities module
//!
//! This module contains shared utilities used across the image pipeline.

pub mod config;
pub mod error;
pub mod warnings;

pub use config::{PipelineConfig, PipelineConfigBuilder, WhiteBalance};
pub use error::{ConversionError, Result, try_alloc};
pub use warnings::{Warning, Warnings};
