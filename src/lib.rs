#![warn(missing_docs)]
/*! Receiver blocks for the marine AIS (Automatic Identification System).

AIS stations self-report position, course, and voyage data as GMSK
bursts on two VHF channels. An SDR front end (tuner, matched filter,
clock recovery, GMSK demodulator) delivers demodulated soft symbols;
this crate turns those into standard NMEA `!AIVDM` sentences and a
human readable decode of each message.

# Architecture overview

An AisRadio application consists of blocks connected by unidirectional
streams, much like GNURadio. Each block has zero or more input streams
and zero or more output streams, and a `work()` function that consumes
what it can and hands control back to the graph.

The AIS receive chain looks like:

```text
   [ soft symbols from the demodulator ]
                  ↓
     [ LmsDfe adaptive equalizer ]
                  ↓
          [ BinarySlicer ]
                  ↓
    [ NrziDecode and BitUnstuff ]
                  ↓
  [ AccessCodeTagger: preamble + flags ]
                  ↓
  [ AisDeframer: CRC check, 6-bit armor ]
                  ↓
  [ AisDecoder: NMEA + decoded report ]
```

The core blocks are:

* [`lms_dfe::LmsDfe`]: a decision feedback equalizer that retrains on
  each burst preamble.
* [`deframer::AisDeframer`]: a tag-driven HDLC deframer. No state
  machine; it works entirely off `ais_preamble` and `ais_frame` stream
  tags, so batch boundaries can't corrupt it.
* [`decode::AisDecoder`]: message-type dispatch and field rendering for
  AIS types 1 through 27.

## Links

* AIVDM/AIVDO protocol notes: <https://gpsd.gitlab.io/gpsd/AIVDM.html>
* US Coast Guard AIS pages: <https://www.navcen.uscg.gov/>
 */

// Blocks.
pub mod access_code_tagger;
pub mod binary_slicer;
pub mod debug_sink;
pub mod decode;
pub mod deframer;
pub mod file_source;
pub mod lms_dfe;
pub mod message_sink;
pub mod nrzi;
pub mod preamble_flags;
pub mod tee;
pub mod unstuff;
pub mod vector_source;

// Non-block helpers.
pub mod nmea;
pub mod sixbit;
pub mod wgs84;

pub mod block;
pub mod blocks;
pub mod graph;
pub mod stream;

/// Float type used. Usually f32, but not guaranteed.
pub type Float = f32;

/// AisRadio error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Plain error message.
    #[error("AisRadio Error: {0}")]
    Msg(String),

    /// Wrapped IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create new error with message.
    pub fn new(msg: &str) -> Self {
        Error::Msg(msg.to_string())
    }
}

impl<T> From<std::sync::PoisonError<std::sync::MutexGuard<'_, stream::Stream<T>>>> for Error {
    fn from(e: std::sync::PoisonError<std::sync::MutexGuard<'_, stream::Stream<T>>>) -> Error {
        Error::Msg(format!("stream lock poisoned: {e}"))
    }
}

/// AisRadio result type, defaulting the error to [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A trait all sample types read from raw files must implement.
pub trait Sample {
    /// The type of the sample.
    type Type;

    /// The serialized size of one sample.
    fn size() -> usize;

    /// Parse one sample.
    fn parse(data: &[u8]) -> Result<Self::Type>;
}

impl Sample for Float {
    type Type = Float;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        Ok(Float::from_le_bytes(data.try_into().map_err(|_| {
            Error::new("wrong number of bytes for a Float sample")
        })?))
    }
}

impl Sample for u8 {
    type Type = u8;
    fn size() -> usize {
        1
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        match data {
            [b] => Ok(*b),
            _ => Err(Error::new("wrong number of bytes for a u8 sample")),
        }
    }
}

#[cfg(test)]
pub mod tests {
    //! Test helper functions.
    use super::*;

    /// For testing, assert that two slices are almost equal.
    ///
    /// Floating point numbers are almost never exactly equal.
    pub fn assert_almost_equal_float(left: &[Float], right: &[Float]) {
        assert_eq!(
            left.len(),
            right.len(),
            "\nleft: {:?}\nright: {:?}",
            left,
            right
        );
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).abs();
            if dist > 0.001 {
                assert_eq!(left[i], right[i], "\nleft: {:?}\nright: {:?}", left, right);
            }
        }
    }
}
