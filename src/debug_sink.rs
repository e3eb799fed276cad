//! Print values to stdout, for debugging.
use crate::block::{Block, BlockRet};
use crate::stream::Streamp;
use crate::Result;

/// Print values to stdout, for debugging.
pub struct DebugSink<T> {
    src: Streamp<T>,
}

impl<T> DebugSink<T> {
    /// Create new DebugSink.
    pub fn new(src: Streamp<T>) -> Self {
        Self { src }
    }
}

impl<T: std::fmt::Debug> Block for DebugSink<T> {
    fn block_name(&self) -> &'static str {
        "DebugSink"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        for s in input.iter() {
            println!("debug: {s:?}");
        }
        input.clear();
        Ok(BlockRet::Ok)
    }
}
