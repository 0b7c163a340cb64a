use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::types::RawFrame;

/// One implementation per raw sub-format. The container parser picks the
/// reader once; everything downstream only sees the resulting [`RawFrame`].
pub trait RawImageReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame>;
}
