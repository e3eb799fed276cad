/*! Access code tagger.

Slides a bit pattern over the input stream and adds a stream tag at
the position immediately *after* each match. The bits themselves pass
through unchanged.

The AIS deframer is driven by two instances of this block: one tagging
`ais_preamble` after the 24-bit training sequence, one tagging
`ais_frame` after each HDLC 0x7E flag. Tagging the position after the
pattern makes the frame arithmetic simple: the distance between the
start and end `ais_frame` tags is the payload length plus one flag
byte.
*/
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, Tag, TagValue, new_streamp};
use crate::{Error, Result};

/// Tag the stream position following each occurrence of a bit pattern.
pub struct AccessCodeTagger {
    src: Streamp<u8>,
    dst: Streamp<u8>,
    tag: String,
    code: u64,
    mask: u64,
    reg: u64,
    /// A match ended exactly at the previous batch boundary.
    pending: bool,
}

impl AccessCodeTagger {
    /// Create new AccessCodeTagger.
    ///
    /// * code: the bit pattern, as 0/1 values, oldest bit first.
    /// * tag: tag key to add on a match.
    pub fn new<T: Into<String>>(src: Streamp<u8>, code: &[u8], tag: T) -> Result<Self> {
        if code.is_empty() || code.len() > 64 {
            return Err(Error::new("access code must be 1 to 64 bits"));
        }
        let mut pattern = 0u64;
        for &b in code {
            pattern = (pattern << 1) | u64::from(b & 1);
        }
        let mask = if code.len() == 64 {
            u64::MAX
        } else {
            (1u64 << code.len()) - 1
        };
        Ok(Self {
            src,
            dst: new_streamp(),
            tag: tag.into(),
            code: pattern,
            mask,
            // All ones, so a pattern of zeros can't match before any
            // input arrived.
            reg: u64::MAX,
            pending: false,
        })
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<u8> {
        self.dst.clone()
    }
}

impl Block for AccessCodeTagger {
    fn block_name(&self) -> &'static str {
        "AccessCodeTagger"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        let n = input.available();
        if n == 0 {
            return Ok(BlockRet::Noop);
        }
        let bits: Vec<u8> = input.iter().copied().collect();
        let mut tags = Vec::new();
        if self.pending {
            tags.push(Tag::new(0, self.tag.clone(), TagValue::Bool(true)));
            self.pending = false;
        }
        for (i, &bit) in bits.iter().enumerate() {
            self.reg = (self.reg << 1) | u64::from(bit & 1);
            if self.reg & self.mask == self.code {
                if i + 1 < n {
                    tags.push(Tag::new(i + 1, self.tag.clone(), TagValue::Bool(true)));
                } else {
                    self.pending = true;
                }
            }
        }
        input.clear();
        drop(input);
        self.dst.lock()?.write_slice_tagged(&bits, &tags);
        Ok(BlockRet::Ok)
    }
}
