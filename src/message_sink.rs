//! Print string messages to stdout.
//!
//! This is the end of the AIS chain: NMEA sentences and decoded
//! reports arrive here as immutable strings, one message per sample.
use crate::block::{Block, BlockRet};
use crate::stream::Streamp;
use crate::Result;

/// Print string messages to stdout.
pub struct MessageSink {
    src: Streamp<String>,
}

impl MessageSink {
    /// Create new MessageSink.
    pub fn new(src: Streamp<String>) -> Self {
        Self { src }
    }
}

impl Block for MessageSink {
    fn block_name(&self) -> &'static str {
        "MessageSink"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        let mut got = false;
        while let Some((msg, _tags)) = input.pop() {
            println!("{msg}");
            got = true;
        }
        if got { Ok(BlockRet::Ok) } else { Ok(BlockRet::Noop) }
    }
}
