/*! HDLC bit unstuffing.

An HDLC transmitter inserts a 0 after five payload 1s in a row so that
the payload can never contain the 0x7E flag pattern. This block drops
those inserted zeros again. The flag itself has six 1s in a row, so it
passes through untouched.

Stream tags are preserved and remapped to the positions the tagged
bits end up at. The flag correlator runs *before* this block (only in
the stuffed stream is 0x7E guaranteed to mean a frame boundary), so
its tags ride through here and come out at unstuffed offsets, which is
what the deframer's frame length arithmetic needs.
*/
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, Tag, new_streamp};
use crate::Result;

/// HDLC bit unstuffer.
pub struct BitUnstuff {
    src: Streamp<u8>,
    dst: Streamp<u8>,
    ones: u32,
}

impl BitUnstuff {
    /// Create new bit unstuffer.
    pub fn new(src: Streamp<u8>) -> Self {
        Self {
            src,
            dst: new_streamp(),
            ones: 0,
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<u8> {
        self.dst.clone()
    }
}

impl Block for BitUnstuff {
    fn block_name(&self) -> &'static str {
        "BitUnstuff"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let bits: Vec<u8> = input.iter().copied().collect();
        let mut tags = input.tags();
        input.clear();
        drop(input);
        tags.sort_by_key(Tag::pos);

        let mut out = Vec::with_capacity(bits.len());
        let mut otags = Vec::with_capacity(tags.len());
        let mut next_tag = tags.into_iter().peekable();
        for (i, &bit) in bits.iter().enumerate() {
            while next_tag.peek().is_some_and(|t| t.pos() == i) {
                let t = next_tag.next().unwrap();
                otags.push(Tag::new(out.len(), t.key(), t.val().clone()));
            }
            if bit == 0 && self.ones == 5 {
                // Stuffed bit.
                self.ones = 0;
                continue;
            }
            self.ones = if bit > 0 { self.ones + 1 } else { 0 };
            out.push(bit);
        }
        self.dst.lock()?.write_slice_tagged(&out, &otags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{TagValue, new_streamp};

    fn run(bits: &[u8]) -> Result<Vec<u8>> {
        let s = new_streamp();
        s.lock()?.write_slice(bits);
        let mut b = BitUnstuff::new(s);
        let out = b.out();
        b.work()?;
        let got = out.lock()?.iter().copied().collect();
        Ok(got)
    }

    #[test]
    fn drops_stuffed_zero() -> Result<()> {
        assert_eq!(run(&[1, 1, 1, 1, 1, 0, 1])?, vec![1, 1, 1, 1, 1, 1]);
        Ok(())
    }

    #[test]
    fn flag_passes_through() -> Result<()> {
        assert_eq!(
            run(&[0, 1, 1, 1, 1, 1, 1, 0])?,
            vec![0, 1, 1, 1, 1, 1, 1, 0]
        );
        Ok(())
    }

    #[test]
    fn plain_bits_untouched() -> Result<()> {
        assert_eq!(run(&[1, 0, 1, 1, 0, 0])?, vec![1, 0, 1, 1, 0, 0]);
        Ok(())
    }

    #[test]
    fn tags_move_with_their_bits() -> Result<()> {
        let s = new_streamp();
        // A stuffed zero at index 5; a tag behind it must shift left.
        s.lock()?.write_slice_tagged(
            &[1, 1, 1, 1, 1, 0, 1, 0, 1],
            &[
                Tag::new(2, "early", TagValue::Bool(true)),
                Tag::new(7, "late", TagValue::Bool(true)),
            ],
        );
        let mut b = BitUnstuff::new(s);
        let out = b.out();
        b.work()?;
        let o = out.lock()?;
        assert_eq!(o.available(), 8);
        let tags = o.tags();
        assert_eq!(tags.len(), 2);
        let find = |k: &str| tags.iter().find(|t| t.key() == k).unwrap().pos();
        assert_eq!(find("early"), 2);
        assert_eq!(find("late"), 6);
        Ok(())
    }
}
