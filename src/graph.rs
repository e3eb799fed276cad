/*! Graphs contain blocks connected by streams, and run them.

# Example

```
use aisradio::graph::Graph;
use aisradio::blocks::{VectorSource, DebugSink};
let src = VectorSource::new(vec![1.0f32, -1.0, 1.0]);
let sink = DebugSink::new(src.out());
let mut g = Graph::new();
g.add(Box::new(src));
g.add(Box::new(sink));
g.run()?;
# Ok::<(), aisradio::Error>(())
```
*/
use std::time::Instant;

use log::{debug, trace};

use crate::Result;
use crate::block::{Block, BlockRet};

/// A graph of blocks, run cooperatively on the calling thread.
///
/// Blocks are called round-robin. The graph is done when a full pass
/// over all blocks makes no progress.
#[derive(Default)]
pub struct Graph {
    blocks: Vec<Box<dyn Block>>,
}

impl Graph {
    /// Create new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Add a block to the graph.
    pub fn add(&mut self, b: Box<dyn Block>) {
        self.blocks.push(b);
    }

    /// Run the graph until no block makes progress.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let st_loop = Instant::now();
            let mut progress = false;
            for b in &mut self.blocks {
                let st = Instant::now();
                let ret = b.work()?;
                trace!("work() on {} returned {ret:?} after {:?}", b.block_name(), st.elapsed());
                if matches!(ret, BlockRet::Ok) {
                    progress = true;
                }
            }
            debug!("Graph loop end. progress: {progress}. Took {:?}", st_loop.elapsed());
            if !progress {
                return Ok(());
            }
        }
    }
}
