/*! LMS decision feedback equalizer with preamble retraining.

An AIS burst starts with a training sequence of alternating bits. This
equalizer runs free most of the time, and every time the upstream
correlator flags a preamble it resets its taps and retrains on the
next 150 symbols before producing output for them, so every burst is
equalized against the channel it actually arrived on.

Consumes two synchronized streams: the demodulated soft symbols, and
one flag byte per symbol where bit 0 is the hard bit decision and
bit 1 is the correlator lock (see [`crate::preamble_flags`]).
Produces one equalized soft decision per symbol.
*/
use log::{debug, trace};

use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::{Float, Result};

/// Samples replayed through the update loop while training.
const TRAIN_LEN: usize = 150;

/// Number of training passes over those samples.
const TRAIN_PASSES: usize = 12;

/// Minimum distance between retrains, in samples.
const RESET_DEBOUNCE: u64 = 50;

fn slice(val: Float) -> Float {
    if val > 0.0 { 1.0 } else { -1.0 }
}

/// LMS decision feedback equalizer, float in and out.
pub struct LmsDfe {
    src: Streamp<Float>,
    flags: Streamp<u8>,
    dst: Streamp<Float>,

    lambda_ff: Float,
    lambda_fb: Float,

    // Delay line capacities are the next power of two above the tap
    // counts, so the ring indices wrap with a bitmask.
    ff_taps: Vec<Float>,
    fb_taps: Vec<Float>,
    ff_delayline: Vec<Float>,
    fb_delayline: Vec<Float>,
    ff_index: usize,
    fb_index: usize,
    reset_counter: u64,
}

impl LmsDfe {
    /// Create a new equalizer.
    ///
    /// * lambda_ff / lambda_fb: LMS step sizes for the feed forward
    ///   and feedback taps.
    /// * num_fftaps / num_fbtaps: tap vector lengths.
    pub fn new(
        src: Streamp<Float>,
        flags: Streamp<u8>,
        lambda_ff: Float,
        lambda_fb: Float,
        num_fftaps: usize,
        num_fbtaps: usize,
    ) -> Self {
        assert!(num_fftaps > 0 && num_fbtaps > 0);
        let mut ret = Self {
            src,
            flags,
            dst: new_streamp(),
            lambda_ff,
            lambda_fb,
            ff_taps: vec![0.0; num_fftaps],
            fb_taps: vec![0.0; num_fbtaps],
            ff_delayline: vec![0.0; num_fftaps.next_power_of_two()],
            fb_delayline: vec![0.0; num_fbtaps.next_power_of_two()],
            ff_index: 0,
            fb_index: 0,
            reset_counter: 0,
        };
        ret.reset();
        ret
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<Float> {
        self.dst.clone()
    }

    /// Reset all taps, with the center feed forward tap at unity.
    fn reset(&mut self) {
        self.ff_taps.fill(0.0);
        let mid = self.ff_taps.len() / 2;
        self.ff_taps[mid] = 1.0;
        self.fb_taps.fill(0.0);
        self.ff_delayline.fill(0.0);
        self.fb_delayline.fill(0.0);
        self.ff_index = 0;
        self.fb_index = 0;
        self.reset_counter = 0;
    }

    /// Run one sample through the filter and the LMS tap update,
    /// returning the soft decision. Decision directed: the slicer's
    /// own output is the reference.
    fn feed(&mut self, sample: Float) -> Float {
        let ff_mask = self.ff_delayline.len() - 1;
        let fb_mask = self.fb_delayline.len() - 1;

        self.ff_delayline[self.ff_index] = sample;

        let mut acc = 0.0;
        for (i, tap) in self.ff_taps.iter().enumerate() {
            acc += self.ff_delayline[(i + self.ff_index) & ff_mask] * tap;
        }
        for (i, tap) in self.fb_taps.iter().enumerate() {
            acc -= self.fb_delayline[(i + self.fb_index) & fb_mask] * tap;
        }

        let decision = slice(acc);
        let error = decision - acc;

        for (i, tap) in self.ff_taps.iter_mut().enumerate() {
            *tap += self.lambda_ff * error * self.ff_delayline[(i + self.ff_index) & ff_mask];
        }
        for (i, tap) in self.fb_taps.iter_mut().enumerate() {
            *tap -= self.lambda_fb * error * self.fb_delayline[(i + self.fb_index) & fb_mask];
        }

        self.fb_index = self.fb_index.wrapping_sub(1) & fb_mask;
        self.ff_index = self.ff_index.wrapping_sub(1) & ff_mask;
        self.fb_delayline[self.fb_index] = decision;

        acc
    }

    #[cfg(test)]
    pub(crate) fn taps(&self) -> (&[Float], &[Float]) {
        (&self.ff_taps, &self.fb_taps)
    }
}

impl Block for LmsDfe {
    fn block_name(&self) -> &'static str {
        "LmsDfe"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let src = self.src.clone();
        let flags_stream = self.flags.clone();
        let mut input = src.lock()?;
        let mut flags = flags_stream.lock()?;
        let n = std::cmp::min(input.available(), flags.available());
        if n == 0 {
            return Ok(BlockRet::Noop);
        }
        let samples: Vec<Float> = input.iter().take(n).copied().collect();
        let fl: Vec<u8> = flags.iter().take(n).copied().collect();

        let mut out = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            if fl[i] & 0x02 != 0 && self.reset_counter > RESET_DEBOUNCE {
                if n - i < TRAIN_LEN {
                    // Not enough lookahead to train on a full
                    // preamble span. Consume what we've done and let
                    // the graph call us again with more.
                    trace!("LmsDfe: deferring retrain, {} of {TRAIN_LEN} available", n - i);
                    break;
                }
                debug!("LmsDfe: retraining on preamble at stream offset {i}");
                self.reset();
                for _ in 0..TRAIN_PASSES {
                    for &s in &samples[i..i + TRAIN_LEN] {
                        self.feed(s);
                    }
                }
                // Fall through: the same span is now replayed in
                // running mode to produce output.
            }
            self.reset_counter += 1;
            let y = self.feed(samples[i]);
            if y.is_finite() {
                out.push(y);
            } else {
                // Diverged taps never recover on their own.
                debug!("LmsDfe: non-finite output, resetting taps");
                self.reset();
                out.push(0.0);
            }
            i += 1;
        }

        if i == 0 {
            return Ok(BlockRet::Noop);
        }
        input.consume(i);
        flags.consume(i);
        drop(input);
        drop(flags);
        self.dst.lock()?.write_slice(&out);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_streamp;
    use rand::Rng;
    use rand::SeedableRng;

    fn make(ff: usize, fb: usize) -> (LmsDfe, Streamp<Float>, Streamp<u8>, Streamp<Float>) {
        let src = new_streamp();
        let flags = new_streamp();
        let b = LmsDfe::new(src.clone(), flags.clone(), 0.01, 0.002, ff, fb);
        let out = b.out();
        (b, src, flags, out)
    }

    #[test]
    fn center_tap_unity_after_reset() {
        let (b, _, _, _) = make(16, 8);
        let (ff, fb) = b.taps();
        assert_eq!(ff[8], 1.0);
        assert!(ff.iter().enumerate().all(|(i, &t)| i == 8 || t == 0.0));
        assert!(fb.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn clean_channel_passes_through() -> Result<()> {
        let (mut b, src, flags, out) = make(16, 8);
        let data: Vec<Float> = (0..400).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        src.lock()?.write_slice(&data);
        flags.lock()?.write_slice(&vec![0u8; 400]);
        b.work()?;
        let got: Vec<Float> = out.lock()?.iter().copied().collect();
        assert_eq!(got.len(), 400);
        // With the identity tap and a clean alternating signal the
        // output should track the input closely once the delay line
        // has filled.
        for (i, (&x, &y)) in data.iter().zip(got.iter()).enumerate().skip(32) {
            assert!((x - y).abs() < 0.2, "sample {i}: {x} vs {y}");
        }
        Ok(())
    }

    #[test]
    fn partial_consume_when_undertrained() -> Result<()> {
        let (mut b, src, flags, out) = make(16, 8);
        // Preamble flag at sample 100, but only 120 samples total:
        // not enough lookahead to train.
        let data: Vec<Float> = (0..120).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let mut fl = vec![0u8; 120];
        fl[100] = 0x02;
        src.lock()?.write_slice(&data);
        flags.lock()?.write_slice(&fl);
        b.work()?;
        assert_eq!(out.lock()?.available(), 100);
        assert_eq!(src.lock()?.available(), 20);

        // Feed the rest of the burst; now training can run and the
        // remaining samples come out.
        let more: Vec<Float> = (0..200).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        src.lock()?.write_slice(&more);
        flags.lock()?.write_slice(&vec![0u8; 200]);
        b.work()?;
        assert_eq!(out.lock()?.available(), 320);
        assert_eq!(src.lock()?.available(), 0);
        Ok(())
    }

    #[test]
    fn retrain_flattens_noisy_channel() -> Result<()> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let (mut b, src, flags, out) = make(16, 8);
        // An attenuated, noisy alternating signal with a preamble
        // flag after the debounce period.
        let n = 400;
        let mut data = Vec::with_capacity(n);
        let mut fl = vec![0u8; n];
        for i in 0..n {
            let sign: Float = if i % 2 == 0 { 1.0 } else { -1.0 };
            let noise: Float = rng.random::<Float>() * 0.1 - 0.05;
            data.push(0.3 * sign + noise);
        }
        fl[80] = 0x02;
        src.lock()?.write_slice(&data);
        flags.lock()?.write_slice(&fl);
        b.work()?;
        let got: Vec<Float> = out.lock()?.iter().copied().collect();
        assert_eq!(got.len(), n);
        // After training, decisions should all have the right sign.
        for i in 250..n {
            let want: Float = if i % 2 == 0 { 1.0 } else { -1.0 };
            assert!(
                got[i] * want > 0.0,
                "sample {i}: expected sign {want}, got {}",
                got[i]
            );
        }
        Ok(())
    }

    #[test]
    fn debounce_blocks_early_retrain() -> Result<()> {
        let (mut b, src, flags, out) = make(16, 8);
        // Flag within the debounce period is ignored: output keeps
        // flowing even though there's no 150-sample lookahead.
        let data = vec![1.0 as Float; 60];
        let mut fl = vec![0u8; 60];
        fl[10] = 0x02;
        src.lock()?.write_slice(&data);
        flags.lock()?.write_slice(&fl);
        b.work()?;
        assert_eq!(out.lock()?.available(), 60);
        Ok(())
    }
}
