/*! AisRadio block trait.

Blocks are the main building blocks of an application. They each do
one thing, and you connect them together with streams to process the
data.
*/
use crate::Result;

/// Return type for all blocks.
///
/// This lets the graph know whether calling the block again could
/// produce more output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRet {
    /// Made progress. Call again.
    Ok,

    /// Produced nothing, because not enough input.
    ///
    /// When all blocks in a graph return either `Noop` or `EOF`, the
    /// graph is done, and `g.run()` returns.
    Noop,

    /// Block will never produce more output.
    ///
    /// Example: reading from a file, without repeating, and the file
    /// reached EOF.
    EOF,
}

/// Block trait, that must be implemented for all blocks.
pub trait Block {
    /// Name of block.
    ///
    /// Not name of *instance* of block.
    fn block_name(&self) -> &'static str;

    /// Block work function.
    ///
    /// A block implementation keeps track of its own inputs and
    /// outputs. It must never block: consume what is available,
    /// produce what fits, and return.
    fn work(&mut self) -> Result<BlockRet>;
}
