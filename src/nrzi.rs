/*! NRZI decoder.

AIS, like AX.25, transmits NRZI on the wire: a symbol transition means
bit 0, no transition means bit 1.
*/
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::Result;

/// NRZI decoder block.
pub struct NrziDecode {
    src: Streamp<u8>,
    dst: Streamp<u8>,
    last: u8,
}

impl NrziDecode {
    /// Create new NRZI decoder.
    pub fn new(src: Streamp<u8>) -> Self {
        Self {
            src,
            dst: new_streamp(),
            last: 0,
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<u8> {
        self.dst.clone()
    }
}

impl Block for NrziDecode {
    fn block_name(&self) -> &'static str {
        "NrziDecode"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let mut out = Vec::with_capacity(input.available());
        for &bit in input.iter() {
            out.push(u8::from(bit == self.last));
            self.last = bit;
        }
        input.clear();
        drop(input);
        self.dst.lock()?.write_slice(&out);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_streamp;

    #[test]
    fn decode() -> Result<()> {
        let s = new_streamp();
        // No transition => 1, transition => 0.
        s.lock()?.write_slice(&[0u8, 0, 1, 1, 1, 0]);
        let mut b = NrziDecode::new(s);
        let out = b.out();
        b.work()?;
        let got: Vec<u8> = out.lock()?.iter().copied().collect();
        assert_eq!(got, vec![1, 1, 0, 1, 1, 0]);
        Ok(())
    }
}
