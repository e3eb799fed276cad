/*! Tag-driven AIS HDLC deframer.

Look ma, no state machine. Instead of stepping a per-bit state
machine, this block reads the `ais_preamble` and frame tags that the
upstream correlators attached to the bit stream, and uses those to cut
whole frames out of the window in one go. Because every call re-scans
the tags in the visible window and consumption is strictly monotonic,
a dropped or split batch cannot corrupt later frames.

For each frame found it checks the CRC-16/X.25 and emits the payload
as a 6-bit armored string, tagged `crc_ok`. CRC failures are dropped
unless [`AisDeframer::set_emit_failed`] asked to keep them for
inspection.

The arithmetic on tag positions: a frame tag marks the bit right
after an HDLC 0x7E flag. The distance from start tag to end tag is
therefore payload + CRC + one trailing flag byte.
*/
use log::{debug, info, trace};

use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, Tag, TagValue, new_streamp};
use crate::{Result, sixbit};

/// Tag key marking the correlator lock on the training sequence.
pub const PREAMBLE_TAG: &str = "ais_preamble";

/// How far past the window end an end tag must be able to exist.
const LOOKAHEAD: usize = 500;

/// Maximum distance from preamble lock to the start flag, bits.
const MAX_START_DISTANCE: usize = 30;

/// Minimum and maximum distance from start tag to end tag, bits.
/// Derived from the shortest and longest AIS frames on the air.
const MIN_FRAME_DISTANCE: usize = 184;
const MAX_FRAME_DISTANCE: usize = 450;

/// CRC-16/X.25 residue of a correct frame, payload and CRC included.
const CRC_RESIDUE: u16 = 0xf0b8;

/// Tag-driven AIS HDLC deframer block.
///
/// Takes a stream of bits (as u8) carrying preamble and frame tags,
/// and outputs armored payload strings.
pub struct AisDeframer {
    src: Streamp<u8>,
    dst: Streamp<String>,
    frame_tag: String,
    emit_failed: bool,
    num_found: u64,
    num_startlost: u64,
    num_stoplost: u64,
    num_crc_error: u64,
}

impl Drop for AisDeframer {
    fn drop(&mut self) {
        info!(
            "AIS Deframer: Decoded {}, CRC error {}, start lost {}, stop lost {}",
            self.num_found, self.num_crc_error, self.num_startlost, self.num_stoplost
        );
    }
}

impl AisDeframer {
    /// Create new AisDeframer.
    ///
    /// `frame_tag` is the tag key marking HDLC flag boundaries,
    /// normally `"ais_frame"`.
    pub fn new<T: Into<String>>(src: Streamp<u8>, frame_tag: T) -> Self {
        Self {
            src,
            dst: new_streamp(),
            frame_tag: frame_tag.into(),
            emit_failed: false,
            num_found: 0,
            num_startlost: 0,
            num_stoplost: 0,
            num_crc_error: 0,
        }
    }

    /// Get the output stream of armored payloads.
    pub fn out(&self) -> Streamp<String> {
        self.dst.clone()
    }

    /// Also emit frames whose CRC failed, tagged `crc_ok = false`.
    pub fn set_emit_failed(&mut self, v: bool) {
        self.emit_failed = v;
    }

    /// Frames decoded with a good CRC so far.
    #[must_use]
    pub fn frames_found(&self) -> u64 {
        self.num_found
    }

    /// Reverse the bits, check the CRC, armor, and push. `bits` is
    /// the frame as received: payload plus CRC trailer, LSB first
    /// within each byte.
    fn parse_frame(&mut self, bits: &[u8]) -> Result<()> {
        // AIS sends each octet low bit first.
        let mut bits = bits.to_vec();
        for byte in bits.chunks_mut(8) {
            byte.reverse();
        }
        let bytes: Vec<u8> = bits.chunks(8).map(bits2byte).collect();

        let crc_ok = calc_crc(&bytes) == CRC_RESIDUE;
        if crc_ok {
            self.num_found += 1;
        } else {
            self.num_crc_error += 1;
            if !self.emit_failed {
                debug!("AisDeframer: dropping frame with bad CRC");
                return Ok(());
            }
        }

        // Strip the CRC; armor the payload into printable ASCII. A
        // few message sizes aren't multiples of 6, so up to 5 bits
        // fall off the end here, same as every other AIS receiver.
        let len6 = (bits.len() - 16) / 6;
        let armored: String = bits[..len6 * 6]
            .chunks(6)
            .map(|c| sixbit::armor(c.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1))))
            .collect();
        debug!("AisDeframer: frame of {} bits, crc_ok={crc_ok}: {armored}", bits.len());
        self.dst.lock()?.push_tagged(
            armored,
            &[Tag::new(0, "crc_ok", TagValue::Bool(crc_ok))],
        );
        Ok(())
    }
}

/// Turn 8 bits in MSB order into a byte.
fn bits2byte(bits: &[u8]) -> u8 {
    bits.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1))
}

const FCSTAB: &[u16] = &[
    // End of line comments used to prevent fmt from creating too long lines.
    0x0000, 0x1189, 0x2312, 0x329b, 0x4624, 0x57ad, 0x6536, 0x74bf, 0x8c48, //.
    0x9dc1, 0xaf5a, 0xbed3, 0xca6c, 0xdbe5, 0xe97e, 0xf8f7, 0x1081, 0x0108, //.
    0x3393, 0x221a, 0x56a5, 0x472c, 0x75b7, 0x643e, 0x9cc9, 0x8d40, 0xbfdb, //.
    0xae52, 0xdaed, 0xcb64, 0xf9ff, 0xe876, 0x2102, 0x308b, 0x0210, 0x1399, //.
    0x6726, 0x76af, 0x4434, 0x55bd, 0xad4a, 0xbcc3, 0x8e58, 0x9fd1, 0xeb6e, //.
    0xfae7, 0xc87c, 0xd9f5, 0x3183, 0x200a, 0x1291, 0x0318, 0x77a7, 0x662e, //.
    0x54b5, 0x453c, 0xbdcb, 0xac42, 0x9ed9, 0x8f50, 0xfbef, 0xea66, 0xd8fd, //.
    0xc974, 0x4204, 0x538d, 0x6116, 0x709f, 0x0420, 0x15a9, 0x2732, 0x36bb, //.
    0xce4c, 0xdfc5, 0xed5e, 0xfcd7, 0x8868, 0x99e1, 0xab7a, 0xbaf3, 0x5285, //.
    0x430c, 0x7197, 0x601e, 0x14a1, 0x0528, 0x37b3, 0x263a, 0xdecd, 0xcf44, //.
    0xfddf, 0xec56, 0x98e9, 0x8960, 0xbbfb, 0xaa72, 0x6306, 0x728f, 0x4014, //.
    0x519d, 0x2522, 0x34ab, 0x0630, 0x17b9, 0xef4e, 0xfec7, 0xcc5c, 0xddd5, //.
    0xa96a, 0xb8e3, 0x8a78, 0x9bf1, 0x7387, 0x620e, 0x5095, 0x411c, 0x35a3, //.
    0x242a, 0x16b1, 0x0738, 0xffcf, 0xee46, 0xdcdd, 0xcd54, 0xb9eb, 0xa862, //.
    0x9af9, 0x8b70, 0x8408, 0x9581, 0xa71a, 0xb693, 0xc22c, 0xd3a5, 0xe13e, //.
    0xf0b7, 0x0840, 0x19c9, 0x2b52, 0x3adb, 0x4e64, 0x5fed, 0x6d76, 0x7cff, //.
    0x9489, 0x8500, 0xb79b, 0xa612, 0xd2ad, 0xc324, 0xf1bf, 0xe036, 0x18c1, //.
    0x0948, 0x3bd3, 0x2a5a, 0x5ee5, 0x4f6c, 0x7df7, 0x6c7e, 0xa50a, 0xb483, //.
    0x8618, 0x9791, 0xe32e, 0xf2a7, 0xc03c, 0xd1b5, 0x2942, 0x38cb, 0x0a50, //.
    0x1bd9, 0x6f66, 0x7eef, 0x4c74, 0x5dfd, 0xb58b, 0xa402, 0x9699, 0x8710, //.
    0xf3af, 0xe226, 0xd0bd, 0xc134, 0x39c3, 0x284a, 0x1ad1, 0x0b58, 0x7fe7, //.
    0x6e6e, 0x5cf5, 0x4d7c, 0xc60c, 0xd785, 0xe51e, 0xf497, 0x8028, 0x91a1, //.
    0xa33a, 0xb2b3, 0x4a44, 0x5bcd, 0x6956, 0x78df, 0x0c60, 0x1de9, 0x2f72, //.
    0x3efb, 0xd68d, 0xc704, 0xf59f, 0xe416, 0x90a9, 0x8120, 0xb3bb, 0xa232, //.
    0x5ac5, 0x4b4c, 0x79d7, 0x685e, 0x1ce1, 0x0d68, 0x3ff3, 0x2e7a, 0xe70e, //.
    0xf687, 0xc41c, 0xd595, 0xa12a, 0xb0a3, 0x8238, 0x93b1, 0x6b46, 0x7acf, //.
    0x4854, 0x59dd, 0x2d62, 0x3ceb, 0x0e70, 0x1ff9, 0xf78f, 0xe606, 0xd49d, //.
    0xc514, 0xb1ab, 0xa022, 0x92b9, 0x8330, 0x7bc7, 0x6a4e, 0x58d5, 0x495c, //.
    0x3de3, 0x2c6a, 0x1ef1, 0x0f78,
];

/// Run the CRC-16/X.25 register over the given bytes. A frame whose
/// payload and trailing CRC leave the register at [`CRC_RESIDUE`] is
/// intact.
#[must_use]
pub(crate) fn calc_crc(data: &[u8]) -> u16 {
    data.iter().fold(0xffffu16, |fcs, byte| {
        let ofs = ((fcs ^ u16::from(*byte)) & 0xff) as usize;
        (fcs >> 8) ^ FCSTAB[ofs]
    })
}

impl Block for AisDeframer {
    fn work(&mut self) -> Result<BlockRet> {
        let mut input = self.src.lock()?;
        let avail = input.available();
        if avail <= LOOKAHEAD {
            return Ok(BlockRet::Noop);
        }
        // We need to be able to look at least LOOKAHEAD bits forward
        // of anything we act on, so an end tag can exist in the
        // window.
        let size = avail - LOOKAHEAD;

        let tags = input.tags();
        let preamble = tags
            .iter()
            .filter(|t| t.key() == PREAMBLE_TAG && t.pos() < size)
            .map(Tag::pos)
            .min();
        let Some(p) = preamble else {
            input.consume(size);
            return Ok(BlockRet::Ok);
        };
        trace!("AisDeframer: preamble at window offset {p}");

        let start = tags
            .iter()
            .filter(|t| t.key() == self.frame_tag && (p..=p + MAX_START_DISTANCE).contains(&t.pos()))
            .map(Tag::pos)
            .min();
        let Some(s) = start else {
            self.num_startlost += 1;
            debug!("AisDeframer: preamble at {p} without start flag");
            input.consume(p + MAX_START_DISTANCE);
            return Ok(BlockRet::Ok);
        };

        let end = tags
            .iter()
            .filter(|t| {
                t.key() == self.frame_tag
                    && (s + MIN_FRAME_DISTANCE..=s + MAX_FRAME_DISTANCE).contains(&t.pos())
            })
            .map(Tag::pos)
            .min();
        let Some(e) = end else {
            self.num_stoplost += 1;
            debug!("AisDeframer: start at {s} without end flag");
            input.consume(p + MAX_FRAME_DISTANCE);
            return Ok(BlockRet::Ok);
        };

        // Payload plus CRC: everything between the tags except the
        // trailing flag byte.
        let datalen = e - s - 8;
        trace!("AisDeframer: frame {s}..{e}, {} payload bits", datalen - 16);
        let bits: Vec<u8> = input.iter().skip(s).take(datalen).copied().collect();
        input.consume(e);
        drop(input);

        if datalen % 8 != 0 {
            debug!("AisDeframer: frame length {datalen} not a multiple of 8, dropping");
            self.num_crc_error += 1;
            return Ok(BlockRet::Ok);
        }
        self.parse_frame(&bits)?;
        Ok(BlockRet::Ok)
    }

    fn block_name(&self) -> &'static str {
        "AisDeframer"
    }
}
