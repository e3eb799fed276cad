/*! AIS receiver.

Reads demodulated soft symbols (one f32 per symbol, little endian)
from a file and runs the full AIS chain: equalizer, slicer, NRZI
decode, bit unstuffing, preamble/flag correlators, deframer, decoder.
NMEA sentences and decoded reports go to stdout.

The upstream part (tuner, matched filter, clock recovery, GMSK
demodulator) is whatever SDR frontend you like, as long as it delivers
one soft symbol per bit at 9600 baud.

```text
$ ais_rx -r channel_a.f32 -d A -v 1 --lon 11.97 --lat 57.70
```
*/
use anyhow::Result;
use clap::Parser;

use aisradio::Float;
use aisradio::blocks::*;
use aisradio::deframer::PREAMBLE_TAG;
use aisradio::graph::Graph;

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    #[arg(short = 'r', help = "Read soft symbols from file (f32le)")]
    read: String,

    #[arg(short = 'd', long, default_value = "A", help = "Channel designator, A or B")]
    designator: char,

    #[arg(short = 'v', default_value = "0", help = "Verbose level, 0-6")]
    verbose: u32,

    #[arg(long, default_value = "200.0", help = "Observer longitude, degrees east")]
    lon: f64,

    #[arg(long, default_value = "100.0", help = "Observer latitude, degrees north")]
    lat: f64,

    #[arg(long, default_value = "0.01")]
    lambda_ff: Float,

    #[arg(long, default_value = "0.002")]
    lambda_fb: Float,

    #[arg(long, default_value = "16")]
    fftaps: usize,

    #[arg(long, default_value = "8")]
    fbtaps: usize,
}

/// The tail of the AIS training sequence, in the data domain. The
/// equalizer's retrain transient can eat the first bits of the
/// preamble, so only the tail is correlated on.
const PREAMBLE: [u8; 16] = [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1];

/// The HDLC flag, 0x7E.
const FLAG: [u8; 8] = [0, 1, 1, 1, 1, 1, 1, 0];

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("aisradio")
        .quiet(false)
        .verbosity(opt.verbose as usize)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let mut g = Graph::new();

    // Soft symbols in, flag bytes on a parallel path for the
    // equalizer's training trigger.
    let src = FileSource::<Float>::new(&opt.read, false)?;
    let tee = Tee::new(src.out());
    let (samples, for_flags) = tee.out();
    let raw_slicer = BinarySlicer::new(for_flags);
    let flags = PreambleFlags::new(raw_slicer.out());

    let dfe = LmsDfe::new(
        samples,
        flags.out(),
        opt.lambda_ff,
        opt.lambda_fb,
        opt.fftaps,
        opt.fbtaps,
    );

    // Equalized bits to tagged HDLC bits. The correlators run before
    // the unstuffer: only in the stuffed stream is 0x7E guaranteed to
    // be a frame boundary. Tags ride through the unstuffer.
    let slicer = BinarySlicer::new(dfe.out());
    let nrzi = NrziDecode::new(slicer.out());
    let preamble = AccessCodeTagger::new(nrzi.out(), &PREAMBLE, PREAMBLE_TAG)?;
    let frames = AccessCodeTagger::new(preamble.out(), &FLAG, "ais_frame")?;
    let unstuff = BitUnstuff::new(frames.out());

    let mut deframer = AisDeframer::new(unstuff.out(), "ais_frame");
    if opt.verbose >= 2 {
        deframer.set_emit_failed(true);
    }
    let decoder = AisDecoder::new(
        deframer.out(),
        opt.designator,
        opt.verbose,
        opt.lon,
        opt.lat,
    );
    let sink = MessageSink::new(decoder.out());

    g.add(Box::new(src));
    g.add(Box::new(tee));
    g.add(Box::new(raw_slicer));
    g.add(Box::new(flags));
    g.add(Box::new(dfe));
    g.add(Box::new(slicer));
    g.add(Box::new(nrzi));
    g.add(Box::new(preamble));
    g.add(Box::new(frames));
    g.add(Box::new(unstuff));
    g.add(Box::new(deframer));
    g.add(Box::new(decoder));
    g.add(Box::new(sink));
    g.run()?;
    Ok(())
}
