//! Source of preloaded samples. Mostly useful for tests and demos.
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, Tag, new_streamp};
use crate::Result;

/// Source of preloaded samples.
pub struct VectorSource<T> {
    data: Vec<T>,
    tags: Vec<Tag>,
    dst: Streamp<T>,
    done: bool,
}

impl<T: Copy> VectorSource<T> {
    /// Create new VectorSource.
    pub fn new(data: Vec<T>) -> Self {
        Self::new_tagged(data, Vec::new())
    }

    /// Create new VectorSource with tags. Tag positions are relative
    /// to the start of the data.
    pub fn new_tagged(data: Vec<T>, tags: Vec<Tag>) -> Self {
        Self {
            data,
            tags,
            dst: new_streamp(),
            done: false,
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<T> {
        self.dst.clone()
    }
}

impl<T: Copy> Block for VectorSource<T> {
    fn block_name(&self) -> &'static str {
        "VectorSource"
    }
    fn work(&mut self) -> Result<BlockRet> {
        if self.done {
            return Ok(BlockRet::EOF);
        }
        self.dst.lock()?.write_slice_tagged(&self.data, &self.tags);
        self.done = true;
        Ok(BlockRet::Ok)
    }
}
