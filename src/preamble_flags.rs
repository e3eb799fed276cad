/*! Build the equalizer's flag-byte stream.

The [equalizer](crate::lms_dfe) wants a second input synchronized with
the sample stream: one byte per symbol, bit 0 carrying the hard bit
decision and bit 1 set on the sample where the preamble correlator
locks. This block produces that stream from sliced raw symbols.

The AIS training sequence is alternating data bits, which NRZI
encoding turns into `00110011…` on the air. The correlator matches 16
bits of that pattern, so it locks while preamble is still incoming:
the equalizer's delay line refill after retraining then lands on
preamble bits instead of on the start flag. Both phases of the
pattern are matched, since the absolute NRZI level is arbitrary. The
equalizer's own debounce absorbs the repeated matches every four bits
for the rest of the preamble.
*/
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::Result;

/// Correlator length, in bits.
const CORR_LEN: usize = 16;

/// `00110011…`, the NRZI encoding of alternating data bits.
const PREAMBLE_AIR: u32 = 0x3333;

/// Pack sliced bits and preamble correlator lock into flag bytes.
pub struct PreambleFlags {
    src: Streamp<u8>,
    dst: Streamp<u8>,
    reg: u32,
}

impl PreambleFlags {
    /// Create new PreambleFlags.
    pub fn new(src: Streamp<u8>) -> Self {
        Self {
            src,
            dst: new_streamp(),
            reg: 0,
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<u8> {
        self.dst.clone()
    }
}

impl Block for PreambleFlags {
    fn block_name(&self) -> &'static str {
        "PreambleFlags"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let mask = (1u32 << CORR_LEN) - 1;
        let mut out = Vec::with_capacity(input.available());
        for &bit in input.iter() {
            self.reg = (self.reg << 1) | u32::from(bit & 1);
            let w = self.reg & mask;
            let lock = w == PREAMBLE_AIR || w == !PREAMBLE_AIR & mask;
            out.push((bit & 1) | (u8::from(lock) << 1));
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
    fn lock_within_training_sequence() -> Result<()> {
        let s = new_streamp();
        // A full 24-bit air preamble after idle zeros. Idle toggles
        // (the NRZI image of data zeros) must not lock.
        let mut bits: Vec<u8> = (0..40).map(|i| (i % 2) as u8).collect();
        bits.extend((0..24).map(|i| u8::from(i % 4 >= 2)));
        s.lock()?.write_slice(&bits);
        let mut b = PreambleFlags::new(s);
        let out = b.out();
        b.work()?;
        let got: Vec<u8> = out.lock()?.iter().copied().collect();
        let locks: Vec<usize> = got
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f & 0x02 != 0)
            .map(|(i, _)| i)
            .collect();
        // First lock 16 bits into the preamble, then every 4 bits.
        assert_eq!(locks, vec![55, 59, 63]);
        Ok(())
    }

    #[test]
    fn opposite_phase_also_locks() -> Result<()> {
        let s = new_streamp();
        let bits: Vec<u8> = (0..CORR_LEN).map(|i| u8::from(i % 4 < 2)).collect();
        s.lock()?.write_slice(&bits);
        let mut b = PreambleFlags::new(s);
        let out = b.out();
        b.work()?;
        let got: Vec<u8> = out.lock()?.iter().copied().collect();
        assert!(got[CORR_LEN - 1] & 0x02 != 0);
        Ok(())
    }
}
