//! Turn positive Float values into binary `1u8`, and non-positive into `0u8`.
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::{Float, Result};

/// Turn positive Float values into binary `1u8`, and non-positive into `0u8`.
pub struct BinarySlicer {
    src: Streamp<Float>,
    dst: Streamp<u8>,
}

impl BinarySlicer {
    /// Create new binary slicer.
    pub fn new(src: Streamp<Float>) -> Self {
        Self {
            src,
            dst: new_streamp(),
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<u8> {
        self.dst.clone()
    }
}

impl Block for BinarySlicer {
    fn block_name(&self) -> &'static str {
        "BinarySlicer"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let bits: Vec<u8> = input.iter().map(|&s| u8::from(s > 0.0)).collect();
        input.clear();
        drop(input);
        self.dst.lock()?.write_slice(&bits);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_streamp;

    #[test]
    fn slice() -> Result<()> {
        let s = new_streamp();
        s.lock()?.write_slice(&[0.1f32, -0.1, 2.0, 0.0]);
        let mut b = BinarySlicer::new(s);
        let out = b.out();
        b.work()?;
        let got: Vec<u8> = out.lock()?.iter().copied().collect();
        assert_eq!(got, vec![1, 0, 1, 0]);
        Ok(())
    }
}
