//! Clone a stream into two.
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::Result;

/// Clone a stream into two.
pub struct Tee<T> {
    src: Streamp<T>,
    dst1: Streamp<T>,
    dst2: Streamp<T>,
}

impl<T: Copy> Tee<T> {
    /// Create new Tee block.
    pub fn new(src: Streamp<T>) -> Self {
        Self {
            src,
            dst1: new_streamp(),
            dst2: new_streamp(),
        }
    }

    /// Get both output streams.
    pub fn out(&self) -> (Streamp<T>, Streamp<T>) {
        (self.dst1.clone(), self.dst2.clone())
    }
}

impl<T: Copy> Block for Tee<T> {
    fn block_name(&self) -> &'static str {
        "Tee"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let data: Vec<T> = input.iter().copied().collect();
        let tags = input.tags();
        input.clear();
        drop(input);
        self.dst1.lock()?.write_slice_tagged(&data, &tags);
        self.dst2.lock()?.write_slice_tagged(&data, &tags);
        Ok(BlockRet::Ok)
    }
}
