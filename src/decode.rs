/*! AIS message decoder.

Takes armored payloads from the [deframer](crate::deframer) and
produces two string messages per frame: the `!AIVDM` NMEA sentence,
and a multi line human readable report.

Useful AIS packet documents:

* <https://www.navcen.uscg.gov/?pageName=AISmain>
* <https://gpsd.gitlab.io/gpsd/AIVDM.html>

Decoders for this protocol tend to end up as a few hundred
near-identical printf blocks, one per message type. Here each message
type is instead described by a table of [`Field`] entries (bit offset,
length, rendering kind, sentinels), and one interpreter walks the
table. Adding a message type is adding a table.

Field values that mean "not available" (SOG 1023, COG 3600, heading
511, and so on) are simply omitted from the report.
*/
use log::debug;

use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, TagValue, new_streamp};
use crate::{Result, nmea, sixbit, wgs84};

/// Verbose bit: render the human readable decode.
pub const V_DECODE: u32 = 1;
/// Verbose bit: minor debug; annotates sentences with CRC status.
pub const V_DEBUG: u32 = 2;
/// Verbose bit: decode rejected and malformed frames, best effort.
pub const V_REJECTED: u32 = 4;
/// Verbose bits: more debug, via the log crate.
pub const V_DEBUG2: u32 = 8;

/// Default observer position: Vaasa, Finland.
const DEFAULT_QTH_LON: f64 = 21.5593;
const DEFAULT_QTH_LAT: f64 = 63.1587;

/// Length of a text field, in 6-bit characters.
#[derive(Clone, Copy)]
enum TextLen {
    Fixed(usize),
    /// Whatever is left of the message after the start offset.
    Remaining,
}

/// One renderable field of an AIS message. Bit offsets count from the
/// start of the message.
#[derive(Clone, Copy)]
enum Field {
    /// Plain unsigned integer.
    UInt {
        label: &'static str,
        off: usize,
        len: usize,
        unit: &'static str,
    },
    /// Unsigned integer divided down to a decimal value.
    Scaled {
        label: &'static str,
        off: usize,
        len: usize,
        div: f64,
        prec: usize,
        unit: &'static str,
    },
    /// One bit choosing between two descriptions.
    Flag {
        label: &'static str,
        off: usize,
        zero: &'static str,
        one: &'static str,
    },
    /// Free text in the 6-bit alphabet.
    Text {
        label: &'static str,
        off: usize,
        len6: TextLen,
    },
    /// Navigation status, types 1-3 and 27.
    NavStatus { off: usize },
    /// Rate of turn with its sentinel encodings.
    Rot { off: usize },
    /// Speed over ground, tenths of a knot or whole knots.
    Sog { off: usize, decis: bool },
    /// Speed over ground, 6-bit whole knots (type 27).
    SogCoarse { off: usize },
    /// Course over ground, tenths of a degree.
    Cog { off: usize },
    /// Course over ground, whole degrees (type 27).
    CogWhole { off: usize },
    /// True heading, degrees.
    Heading { off: usize },
    /// SAR aircraft altitude, meters.
    Altitude { off: usize },
    /// Longitude and latitude pair, with distance and bearing from
    /// the observer. `reduced` selects the 18+17 bit layout scaled to
    /// tenths of minutes (types 17 and 27) instead of the standard
    /// 28+27 bit ten-thousandths of minutes.
    Position {
        off: usize,
        reduced: bool,
        subject: &'static str,
    },
    /// Maneuver indicator, types 1-3.
    Maneuver { off: usize },
    /// RAIM flag.
    Raim { off: usize },
    /// Electronic position fixing device type.
    Epfd { off: usize },
    /// Ship and cargo type, with hazard categories.
    ShipType { off: usize },
    /// Bow/stern/port/starboard dimensions.
    Dimensions { off: usize },
    /// Estimated time of arrival, type 5.
    Eta { off: usize },
    /// Full UTC date and time, type 4.
    UtcDateTime { off: usize },
    /// UTC second plus the off-position indicator, type 21.
    AtonStatus { off: usize },
    /// Aid-to-navigation type, type 21.
    AtonType { off: usize },
    /// Remaining payload as hex, type 17.
    HexDump { label: &'static str, off: usize },
    /// Fields only present when the message is long enough.
    Group {
        min_bits: usize,
        fields: &'static [Field],
    },
}

/// Expected message size.
#[derive(Clone, Copy)]
enum SizeCheck {
    /// Exactly this many bits (after the armor's truncation to a
    /// multiple of 6).
    Exact(usize),
    /// One of two exact sizes.
    OneOf2(usize, usize),
    /// At least this many bits.
    AtLeast(usize),
}

impl SizeCheck {
    fn ok(&self, bits: usize) -> bool {
        match *self {
            SizeCheck::Exact(want) => bits == want,
            SizeCheck::OneOf2(a, b) => bits == a || bits == b,
            SizeCheck::AtLeast(min) => bits >= min,
        }
    }
}

/// Field layout of one message type.
struct Layout {
    size: SizeCheck,
    /// Human readable expected size, for the debug log.
    want: &'static str,
    fields: &'static [Field],
}

const POSITION_REPORT: Layout = Layout {
    size: SizeCheck::Exact(168),
    want: "168",
    fields: &[
        Field::NavStatus { off: 38 },
        Field::Rot { off: 42 },
        Field::Sog { off: 50, decis: true },
        Field::Position { off: 61, reduced: false, subject: "vessel" },
        Field::Cog { off: 116 },
        Field::Heading { off: 128 },
        Field::UInt { label: "Time Stamp", off: 137, len: 6, unit: " seconds" },
        Field::Maneuver { off: 143 },
        Field::Raim { off: 148 },
    ],
};

const BASE_STATION: Layout = Layout {
    size: SizeCheck::Exact(168),
    want: "168",
    fields: &[
        Field::Epfd { off: 134 },
        Field::UtcDateTime { off: 38 },
        Field::Position { off: 79, reduced: false, subject: "station" },
    ],
};

const STATIC_AND_VOYAGE: Layout = Layout {
    // 424 bits on the air; the armor truncates to 70 six-bit chars.
    size: SizeCheck::Exact(420),
    want: "424",
    fields: &[
        Field::UInt { label: "AIS version", off: 38, len: 2, unit: "" },
        Field::UInt { label: "IMO Number", off: 40, len: 30, unit: "" },
        Field::Text { label: "Call Sign", off: 70, len6: TextLen::Fixed(7) },
        Field::Text { label: "Ship Name", off: 112, len6: TextLen::Fixed(20) },
        Field::ShipType { off: 232 },
        Field::Dimensions { off: 240 },
        Field::Scaled { label: "Draught", off: 294, len: 8, div: 10.0, prec: 1, unit: " m" },
        Field::Epfd { off: 270 },
        Field::Text { label: "Destination", off: 302, len6: TextLen::Fixed(20) },
        Field::Eta { off: 274 },
    ],
};

const SAR_AIRCRAFT: Layout = Layout {
    size: SizeCheck::Exact(168),
    want: "168",
    fields: &[
        Field::Altitude { off: 38 },
        Field::Sog { off: 50, decis: false },
        Field::Position { off: 61, reduced: false, subject: "aircraft" },
        Field::Cog { off: 116 },
    ],
};

const UTC_INQUIRY: Layout = Layout {
    size: SizeCheck::Exact(72),
    want: "72",
    fields: &[Field::UInt { label: "Destination MMSI", off: 40, len: 30, unit: "" }],
};

const ADDRESSED_SAFETY: Layout = Layout {
    size: SizeCheck::AtLeast(78),
    want: ">72",
    fields: &[
        Field::UInt { label: "Sequence Number", off: 38, len: 2, unit: "" },
        Field::UInt { label: "Destination MMSI", off: 40, len: 30, unit: "" },
        Field::Text { label: "Message", off: 72, len6: TextLen::Remaining },
    ],
};

const SAFETY_BROADCAST: Layout = Layout {
    size: SizeCheck::AtLeast(42),
    want: ">42",
    fields: &[Field::Text { label: "Message", off: 40, len6: TextLen::Remaining }],
};

const INTERROGATION: Layout = Layout {
    size: SizeCheck::AtLeast(84),
    want: "88-160",
    fields: &[
        Field::UInt { label: "Interrogated MMSI", off: 40, len: 30, unit: "" },
        Field::UInt { label: "First message type", off: 70, len: 6, unit: "" },
        Field::UInt { label: "First slot offset", off: 76, len: 12, unit: "" },
        Field::Group {
            min_bits: 108,
            fields: &[
                Field::UInt { label: "Second message type", off: 90, len: 6, unit: "" },
                Field::UInt { label: "Second slot offset", off: 96, len: 12, unit: "" },
            ],
        },
        Field::Group {
            min_bits: 158,
            fields: &[
                Field::UInt { label: "Interrogated MMSI", off: 110, len: 30, unit: "" },
                Field::UInt { label: "First message type", off: 140, len: 6, unit: "" },
                Field::UInt { label: "First slot offset", off: 146, len: 12, unit: "" },
            ],
        },
    ],
};

const ASSIGNMENT_MODE: Layout = Layout {
    size: SizeCheck::OneOf2(96, 144),
    want: "96 or 144",
    fields: &[
        Field::UInt { label: "Destination A MMSI", off: 40, len: 30, unit: "" },
        Field::UInt { label: "Offset A", off: 70, len: 12, unit: "" },
        Field::UInt { label: "Increment A", off: 82, len: 10, unit: "" },
        Field::Group {
            min_bits: 144,
            fields: &[
                Field::UInt { label: "Destination B MMSI", off: 92, len: 30, unit: "" },
                Field::UInt { label: "Offset B", off: 122, len: 12, unit: "" },
                Field::UInt { label: "Increment B", off: 134, len: 10, unit: "" },
            ],
        },
    ],
};

const DGNSS_BROADCAST: Layout = Layout {
    size: SizeCheck::AtLeast(78),
    want: "80-816",
    fields: &[
        Field::Position { off: 40, reduced: true, subject: "corrections for GPS" },
        Field::HexDump { label: "DGNSS correction data (hex):", off: 80 },
    ],
};

const CLASS_B_POSITION: Layout = Layout {
    size: SizeCheck::Exact(168),
    want: "168",
    fields: &[
        Field::Sog { off: 46, decis: true },
        Field::Position { off: 57, reduced: false, subject: "vessel" },
        Field::Cog { off: 112 },
        Field::Heading { off: 124 },
        Field::UInt { label: "Time Stamp", off: 133, len: 6, unit: " UTC seconds" },
        Field::Flag {
            label: "Carrier Sense Unit",
            off: 141,
            zero: "Class B SOTDMA",
            one: "Class B Carrier Sense",
        },
        Field::Flag {
            label: "Display",
            off: 142,
            zero: "No display available. Not capable of displaying Message 12 and 14",
            one: "Equipped with integrated display displaying Message 12 and 14",
        },
        Field::Flag {
            label: "VHF Digital Selective Calling",
            off: 143,
            zero: "Not equipped",
            one: "Equipped with DSC function (dedicated or time-shared)",
        },
        Field::Flag {
            label: "VHF Band capability",
            off: 144,
            zero: "Capable of operating over the upper 525 kHz band of the marine band",
            one: "Capable of operating over the whole marine band",
        },
        Field::Flag {
            label: "Message 22 capability",
            off: 145,
            zero: "No frequency management via Message 22, operating on AIS1, AIS2 only",
            one: "Frequency management via Message 22",
        },
        Field::Flag {
            label: "Station Mode",
            off: 146,
            zero: "Station operating in autonomous and continuous mode",
            one: "Station operating in assigned mode",
        },
        Field::Raim { off: 147 },
    ],
};

const CLASS_B_EXTENDED: Layout = Layout {
    size: SizeCheck::Exact(312),
    want: "312",
    fields: &[
        Field::Sog { off: 46, decis: true },
        Field::Position { off: 57, reduced: false, subject: "vessel" },
        Field::Cog { off: 112 },
        Field::Heading { off: 124 },
        Field::UInt { label: "Time Stamp", off: 133, len: 6, unit: " UTC seconds" },
        Field::Text { label: "Ship Name", off: 143, len6: TextLen::Fixed(20) },
        Field::ShipType { off: 263 },
        Field::Dimensions { off: 271 },
        Field::Epfd { off: 301 },
        Field::Raim { off: 305 },
        Field::Flag {
            label: "Station Mode",
            off: 307,
            zero: "Station operating in autonomous and continuous mode",
            one: "Station operating in assigned mode",
        },
    ],
};

const AID_TO_NAVIGATION: Layout = Layout {
    size: SizeCheck::AtLeast(270),
    want: ">272",
    fields: &[
        Field::AtonType { off: 38 },
        Field::Text { label: "Name", off: 43, len6: TextLen::Fixed(20) },
        Field::Position { off: 164, reduced: false, subject: "aid to navigation" },
        Field::Dimensions { off: 219 },
        Field::Epfd { off: 249 },
        Field::AtonStatus { off: 253 },
        Field::Raim { off: 268 },
        Field::Flag {
            label: "Virtual Aid to Navigation",
            off: 269,
            zero: "Real Aid to Navigation at indicated position",
            one: "Virtual Aid to Navigation simulated by nearby AIS station",
        },
    ],
};

// Type 24 is two messages sharing a type number; `part` at bit 38
// picks the layout. 160 bits on the air for part A truncates to 26
// armored chars.
const STATIC_DATA_A: Layout = Layout {
    size: SizeCheck::OneOf2(156, 168),
    want: "(Class A) 160 or (Class B) 168",
    fields: &[Field::Text { label: "Ship Name", off: 40, len6: TextLen::Fixed(20) }],
};

const STATIC_DATA_B: Layout = Layout {
    size: SizeCheck::OneOf2(156, 168),
    want: "(Class A) 160 or (Class B) 168",
    fields: &[
        Field::ShipType { off: 40 },
        Field::Text { label: "Vendor ID", off: 48, len6: TextLen::Fixed(7) },
        Field::Text { label: "Call Sign", off: 90, len6: TextLen::Fixed(7) },
        Field::Dimensions { off: 132 },
        // For an auxiliary craft the dimension bits carry the mother
        // ship's MMSI instead.
        Field::UInt { label: "Mothership MMSI", off: 132, len: 30, unit: "" },
    ],
};

const LONG_RANGE: Layout = Layout {
    size: SizeCheck::Exact(96),
    want: "96",
    fields: &[
        Field::Raim { off: 39 },
        Field::NavStatus { off: 40 },
        Field::Position { off: 44, reduced: true, subject: "vessel" },
        Field::SogCoarse { off: 79 },
        Field::CogWhole { off: 85 },
        Field::Flag {
            label: "GNSS Position status",
            off: 94,
            zero: "Current GNSS position",
            one: "Not GNSS position",
        },
    ],
};

/// Report names for all defined types, index 1 to 27.
const TYPE_NAMES: [&str; 28] = [
    "",
    "Position Report Class A",
    "Position Report Class A (Assigned schedule)",
    "Position Report Class A (Response to interrogation)",
    "Base Station Report",
    "Static and Voyage Related Data",
    "Binary Addressed Message",
    "Binary Acknowledge",
    "Binary Broadcast Message",
    "Standard SAR Aircraft Position Report",
    "UTC and Date Inquiry",
    "UTC and Date Response",
    "Addressed Safety Related Message",
    "Safety Related Acknowledgement",
    "Safety Related Broadcast Message",
    "Interrogation",
    "Assignment Mode Command",
    "DGNSS Binary Broadcast Message",
    "Standard Class B Carrier Sense Position Report",
    "Extended Class B Carrier Sense Equipment Position Report",
    "Data Link Management",
    "Aid-to-Navigation Report",
    "Channel Management",
    "Group Assignment Command",
    "Static Data Report",
    "Single Slot Binary Message",
    "Multiple Slot Binary Message With Communications State",
    "Position Report For Long-Range Applications",
];

/// Field layout for a message type, if we decode its fields.
fn layout(ty: u32, sym: &[u8]) -> Option<&'static Layout> {
    Some(match ty {
        1..=3 => &POSITION_REPORT,
        4 => &BASE_STATION,
        5 => &STATIC_AND_VOYAGE,
        9 => &SAR_AIRCRAFT,
        10 | 11 => &UTC_INQUIRY,
        12 | 13 => &ADDRESSED_SAFETY,
        14 => &SAFETY_BROADCAST,
        15 => &INTERROGATION,
        16 => &ASSIGNMENT_MODE,
        17 => &DGNSS_BROADCAST,
        18 => &CLASS_B_POSITION,
        19 => &CLASS_B_EXTENDED,
        21 => &AID_TO_NAVIGATION,
        24 => {
            if sixbit::value(sym, 38, 2) & 1 == 0 {
                &STATIC_DATA_A
            } else {
                &STATIC_DATA_B
            }
        }
        27 => &LONG_RANGE,
        _ => return None,
    })
}

/// AIS message decoder block.
///
/// Pops armored payloads, pushes the NMEA sentence and (verbosity
/// permitting) the decoded report to the output queue.
pub struct AisDecoder {
    src: Streamp<String>,
    dst: Streamp<String>,
    designator: char,
    verbose: u32,
    qth_lon: f64,
    qth_lat: f64,
}

impl AisDecoder {
    /// Create new AisDecoder.
    ///
    /// * designator: receive channel, 'A' (161.975 MHz) or 'B'
    ///   (162.025 MHz).
    /// * verbose: level 0-6. Each level enables everything below it:
    ///   1 decodes messages, 2 annotates CRC status, 3 decodes
    ///   rejected frames best effort, 4-6 add debug logging.
    /// * lon, lat: observer position for distance and bearing.
    ///   Out-of-range values fall back to the defaults.
    pub fn new(src: Streamp<String>, designator: char, verbose: u32, lon: f64, lat: f64) -> Self {
        Self {
            src,
            dst: new_streamp(),
            designator,
            verbose: (1u32 << verbose.min(6)) - 1,
            qth_lon: if (-180.0..=180.0).contains(&lon) { lon } else { DEFAULT_QTH_LON },
            qth_lat: if (-90.0..=90.0).contains(&lat) { lat } else { DEFAULT_QTH_LAT },
        }
    }

    /// Get the output message stream.
    pub fn out(&self) -> Streamp<String> {
        self.dst.clone()
    }

    /// Decode one armored payload into the human readable report.
    /// None if there's nothing to say about it at this verbosity.
    fn decode(&self, payload: &str) -> Option<String> {
        let sym = sixbit::unarmor_str(payload);
        if sym.is_empty() {
            return None;
        }
        let bits = sym.len() * 6;
        let ty = u32::from(sym[0]);
        if !(1..=27).contains(&ty) && self.verbose & V_REJECTED == 0 {
            return None;
        }

        let mut out = String::new();
        let (channel, mhz) = match self.designator {
            'A' => (87, "161.975"),
            _ => (88, "162.025"),
        };
        out += &format!("AIS VHF maritime channel {channel}B ({mhz} MHz)\n");
        out += &format!(
            "Mobile Marine Service Identifier: {}\n",
            sixbit::value(&sym, 8, 30)
        );
        match TYPE_NAMES.get(ty as usize) {
            Some(name) if ty >= 1 => out += &format!("{name}\n"),
            _ => out += &format!("Unknown AIS report type {ty}\n"),
        }

        if let Some(layout) = layout(ty, &sym) {
            if !layout.size.ok(bits) {
                debug!(
                    "AisDecoder: erroneous type {ty} report size {bits} bit, should be {} bit",
                    layout.want
                );
                if self.verbose & V_REJECTED == 0 {
                    return Some(out);
                }
            }
            for f in layout.fields {
                self.render(f, &sym, &mut out);
            }
        }
        Some(out)
    }

    /// Render one field into the report, if it has anything to show.
    fn render(&self, field: &Field, sym: &[u8], out: &mut String) {
        let len6 = sym.len();
        match *field {
            Field::UInt { label, off, len, unit } => {
                let v = sixbit::value(sym, off, len);
                out.push_str(&format!("{label}: {v}{unit}\n"));
            }
            Field::Scaled { label, off, len, div, prec, unit } => {
                let v = f64::from(sixbit::value(sym, off, len)) / div;
                out.push_str(&format!("{label}: {v:.prec$}{unit}\n"));
            }
            Field::Flag { label, off, zero, one } => {
                let v = sixbit::value(sym, off, 1);
                out.push_str(&format!("{label}: {}\n", if v == 0 { zero } else { one }));
            }
            Field::Text { label, off, len6: tl } => {
                let n = match tl {
                    TextLen::Fixed(n) => n,
                    TextLen::Remaining => (len6 * 6).saturating_sub(off) / 6,
                };
                out.push_str(&format!("{label}: {}\n", sixbit::text(sym, off, n)));
            }
            Field::NavStatus { off } => {
                let status = match sixbit::value(sym, off, 4) {
                    0 => "Under way using engine",
                    1 => "At anchor",
                    2 => "Not under command",
                    3 => "Restricted manoeuverability",
                    4 => "Constrained by her draught",
                    5 => "Moored",
                    6 => "Aground",
                    7 => "Engaged in Fishing",
                    8 => "Under way sailing",
                    _ => return,
                };
                out.push_str(&format!("Navigation Status: {status}\n"));
            }
            Field::Rot { off } => {
                let i = sixbit::signed_value(sym, off, 8);
                match i {
                    127 => out.push_str("Rate of Turn: Right at more than 5° per 30 second\n"),
                    -127 => out.push_str("Rate of Turn: Left at more than 5° per 30 second\n"),
                    0 | -128 => {}
                    _ => {
                        let d = (f64::from(i) / 4.733).powi(2);
                        out.push_str(&format!(
                            "Rate of Turn: {} at {d:.3}°/min\n",
                            if i > 0 { "Right" } else { "Left" }
                        ));
                    }
                }
            }
            Field::Sog { off, decis } => {
                let v = sixbit::value(sym, off, 10);
                if v == 1023 {
                    return;
                }
                let suffix = if v == 1022 { "or more" } else { "knots" };
                if decis {
                    let speed = f64::from(v) / 10.0;
                    out.push_str(&format!("Speed Over Ground: {speed:.1} {suffix}\n"));
                } else {
                    out.push_str(&format!("Speed Over Ground: {v} {suffix}\n"));
                }
            }
            Field::SogCoarse { off } => {
                let v = sixbit::value(sym, off, 6);
                if v < 63 {
                    out.push_str(&format!("Speed Over Ground: {v} knots\n"));
                }
            }
            Field::Cog { off } => {
                let v = sixbit::value(sym, off, 12);
                if v != 3600 {
                    out.push_str(&format!("Course Over Ground: {:.1}°\n", f64::from(v) / 10.0));
                }
            }
            Field::CogWhole { off } => {
                let v = sixbit::value(sym, off, 9);
                if v != 511 {
                    out.push_str(&format!("Course Over Ground: {v}°\n"));
                }
            }
            Field::Heading { off } => {
                let v = sixbit::value(sym, off, 9);
                if v < 360 {
                    out.push_str(&format!("True Heading: {v}°\n"));
                }
            }
            Field::Altitude { off } => {
                let v = sixbit::value(sym, off, 12);
                if v != 4095 {
                    out.push_str(&format!("Altitude: {v} m\n"));
                }
            }
            Field::Position { off, reduced, subject } => {
                self.render_position(sym, off, reduced, subject, out);
            }
            Field::Maneuver { off } => {
                match sixbit::value(sym, off, 2) {
                    0 => {}
                    1 => out.push_str("Maneuver Indicator: No special maneuver\n"),
                    _ => out.push_str(
                        "Maneuver Indicator: Special maneuver (such as regional passing arrangement)\n",
                    ),
                }
            }
            Field::Raim { off } => {
                let v = sixbit::value(sym, off, 1);
                out.push_str(&format!(
                    "Receiver Autonomous Integrity Monitoring: {}\n",
                    if v == 0 { "RAIM not in use" } else { "RAIM in use" }
                ));
            }
            Field::Epfd { off } => {
                let fix = match sixbit::value(sym, off, 4) {
                    1 => "GPS",
                    2 => "GLONASS",
                    3 => "Combined GPS/GLONASS",
                    4 => "Loran-C",
                    5 => "Chayka",
                    6 => "Integrated navigation system",
                    7 => "Surveyed",
                    8 => "Galileo",
                    _ => return,
                };
                out.push_str(&format!("Station Electronic Position Fixing Device: {fix}\n"));
            }
            Field::ShipType { off } => {
                if let Some(name) = ship_type_name(sixbit::value(sym, off, 8)) {
                    out.push_str(&format!("Ship Type: {name}\n"));
                }
            }
            Field::Dimensions { off } => {
                for (label, pos, len, max) in [
                    ("Dimension to Bow", off, 9, 511),
                    ("Dimension to Stern", off + 9, 9, 511),
                    ("Dimension to Port", off + 18, 6, 63),
                    ("Dimension to Starboard", off + 24, 6, 63),
                ] {
                    let v = sixbit::value(sym, pos, len);
                    if v != 0 {
                        out.push_str(&format!(
                            "{label}: {v} m{}\n",
                            if v == max { " or greater" } else { "" }
                        ));
                    }
                }
            }
            Field::Eta { off } => {
                let month = sixbit::value(sym, off, 4);
                if month != 0 {
                    out.push_str(&format!(
                        "Estimated Time of Arrival {month:02}-{:02} {:02}:{:02} UTC\n",
                        sixbit::value(sym, off + 4, 5),
                        sixbit::value(sym, off + 9, 5),
                        sixbit::value(sym, off + 14, 6),
                    ));
                }
            }
            Field::UtcDateTime { off } => {
                out.push_str(&format!(
                    "{}-{:02}-{:02} {:02}:{:02}:{:02} UTC\n",
                    sixbit::value(sym, off, 14),
                    sixbit::value(sym, off + 14, 4),
                    sixbit::value(sym, off + 18, 5),
                    sixbit::value(sym, off + 23, 5),
                    sixbit::value(sym, off + 28, 6),
                    sixbit::value(sym, off + 34, 6),
                ));
            }
            Field::AtonStatus { off } => {
                // The off-position indicator is only valid when the
                // UTC second is 59 or below.
                let v = sixbit::value(sym, off, 6);
                if v < 60 {
                    out.push_str(&format!("UTC Second: {v}\n"));
                    let off_pos = sixbit::value(sym, off + 6, 1);
                    out.push_str(&format!(
                        "Off-Position Indicator: {} position\n",
                        if off_pos == 0 { "On" } else { "Off" }
                    ));
                }
            }
            Field::AtonType { off } => {
                if let Some(name) = aton_type_name(sixbit::value(sym, off, 5)) {
                    out.push_str(&format!("Navigation Aid Type: {name}\n"));
                }
            }
            Field::HexDump { label, off } => {
                let n = (len6 * 6).saturating_sub(off) / 6;
                if n == 0 {
                    return;
                }
                out.push_str(label);
                out.push('\n');
                for i in 0..n {
                    let v = sixbit::value(sym, off + i * 6, 6);
                    out.push_str(&format!("{v:02X}"));
                    if i + 1 < n {
                        out.push(if (i + 1) % 16 == 0 { '\n' } else { ' ' });
                    }
                }
                out.push('\n');
            }
            Field::Group { min_bits, fields } => {
                if len6 * 6 >= min_bits {
                    for f in fields {
                        self.render(f, sym, out);
                    }
                }
            }
        }
    }

    /// Longitude, latitude, and the way there from the observer.
    fn render_position(&self, sym: &[u8], off: usize, reduced: bool, subject: &str, out: &mut String) {
        let (lon_bits, lat_bits, div) = if reduced {
            // Tenths of minutes: types 17 and 27.
            (18, 17, 600.0)
        } else {
            // Ten thousandths of minutes.
            (28, 27, 600_000.0)
        };
        let lon = f64::from(sixbit::signed_value(sym, off, lon_bits)) / div;
        let lat = f64::from(sixbit::signed_value(sym, off + lon_bits, lat_bits)) / div;

        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            debug!("AisDecoder: erroneous latitude {lat} or longitude {lon}");
            if self.verbose & V_REJECTED == 0 {
                return;
            }
        }

        let (d, m, s) = wgs84::to_dms(lon);
        out.push_str(&format!(
            "Longitude: {} {d}° {m}' {s:.3}\" ({lon:.6}°)\n",
            if lon < 0.0 { 'W' } else { 'E' }
        ));
        let (d, m, s) = wgs84::to_dms(lat);
        out.push_str(&format!(
            "Latitude : {} {d}° {m}' {s:.3}\" ({lat:.6}°)\n",
            if lat < 0.0 { 'S' } else { 'N' }
        ));

        let (dist, az) = wgs84::distance_bearing(self.qth_lon, self.qth_lat, lon, lat);
        let local = if dist > 10_000.0 {
            format!("{:.3} km", dist / 1000.0)
        } else {
            format!("{dist:.0} m")
        };
        out.push_str(&format!(
            "Distance {:.3} M ({local}) and bearing {az:.1}° to {subject}\n",
            dist / 1851.85
        ));
    }
}

/// Ship and cargo type name, ITU-R M.1371 table 53. The x1-x4 codes
/// of each category carry a hazard class A-D.
fn ship_type_name(v: u32) -> Option<String> {
    let hazard = |base: &str, first: u32| {
        let cat = (b'A' + (v - first) as u8) as char;
        Some(format!("{base}. Hazardous category {cat} ({v})"))
    };
    match v {
        20 => Some("Wing in ground (WIG)".into()),
        21..=24 => hazard("Wing in ground (WIG)", 21),
        30 => Some("Fishing".into()),
        31 => Some("Towing".into()),
        32 => Some("Towing: length exceeds 200m or breadth exceeds 25m".into()),
        33 => Some("Dredging or underwater ops".into()),
        34 => Some("Diving ops".into()),
        35 => Some("Military ops".into()),
        36 => Some("Sailing".into()),
        37 => Some("Pleasure Craft".into()),
        40 | 49 => Some("High speed craft (HSC)".into()),
        41..=44 => hazard("High speed craft (HSC)", 41),
        50 => Some("Pilot vessel".into()),
        51 => Some("Search and Rescue vessel".into()),
        52 => Some("Tug".into()),
        53 => Some("Port Tender (vessel anchored off shore)".into()),
        54 => Some("Anti-pollution equipment".into()),
        55 => Some("Law Enforcement".into()),
        58 => Some("Medical Transport".into()),
        59 => Some("Noncombatant ship according to RR Resolution No. 18".into()),
        60 | 69 => Some("Passenger".into()),
        61..=64 => hazard("Passenger", 61),
        70 | 79 => Some("Cargo".into()),
        71..=74 => hazard("Cargo", 71),
        80 | 89 => Some("Tanker".into()),
        81..=84 => hazard("Tanker", 81),
        90 | 99 => Some("Other Type".into()),
        91..=94 => hazard("Other Type", 91),
        _ => None,
    }
}

/// Aid-to-navigation type name, type 21.
fn aton_type_name(v: u32) -> Option<&'static str> {
    Some(match v {
        0 => "Not specified",
        1 => "Reference point",
        2 => "Radar transponder marking a navigation hazard",
        3 => "Fixed structure off shore, such as oil platforms, wind farms, rigs, etc",
        5 => "Light, without sectors",
        6 => "Light, with sectors",
        7 => "Leading Light Front",
        8 => "Leading Light Rear",
        9 => "Beacon, Cardinal North",
        10 => "Beacon, Cardinal East",
        11 => "Beacon, Cardinal South",
        12 => "Beacon, Cardinal West",
        13 => "Beacon, Port hand",
        14 => "Beacon, Starboard hand",
        15 => "Beacon, Preferred Channel port hand",
        16 => "Beacon, Preferred Channel starboard hand",
        17 => "Beacon, Isolated danger",
        18 => "Beacon, Safe water",
        19 => "Beacon, Special mark",
        20 => "Cardinal Mark North",
        21 => "Cardinal Mark East",
        22 => "Cardinal Mark South",
        23 => "Cardinal Mark West",
        24 => "Port hand Mark",
        25 => "Starboard hand Mark",
        26 => "Preferred Channel Port hand",
        27 => "Preferred Channel Starboard hand",
        28 => "Isolated danger",
        29 => "Safe Water",
        30 => "Special Mark",
        31 => "Light Vessel / LANBY / Rigs",
        _ => return None,
    })
}

impl Block for AisDecoder {
    fn block_name(&self) -> &'static str {
        "AisDecoder"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let mut msgs = Vec::new();
        {
            let mut input = self.src.lock()?;
            while let Some((payload, tags)) = input.pop() {
                let crc_ok = tags
                    .iter()
                    .find(|t| t.key() == "crc_ok")
                    .map(|t| *t.val() == TagValue::Bool(true))
                    .unwrap_or(true);

                let mut sentence = nmea::aivdm(self.designator, &payload);
                if self.verbose & V_DEBUG != 0 {
                    sentence += if crc_ok { " <- CRC OK!" } else { " <- CRC Failed!" };
                }
                msgs.push(sentence);

                if !crc_ok && self.verbose & V_REJECTED == 0 {
                    continue;
                }
                if self.verbose & V_DECODE != 0 {
                    if let Some(report) = self.decode(&payload) {
                        msgs.push(report);
                    }
                }
            }
        }
        if msgs.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let mut o = self.dst.lock()?;
        for m in msgs {
            o.push(m);
        }
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Tag, new_streamp};

    /// Write a big-endian field into a 6-bit symbol buffer.
    fn pack(sym: &mut [u8], bit_pos: usize, len: usize, v: u32) {
        for i in 0..len {
            let bit = ((v >> (len - 1 - i)) & 1) as u8;
            let pos = bit_pos + i;
            let shift = 5 - pos % 6;
            sym[pos / 6] = (sym[pos / 6] & !(1 << shift)) | (bit << shift);
        }
    }

    fn armor_all(sym: &[u8]) -> String {
        sym.iter().map(|&v| sixbit::armor(v)).collect()
    }

    fn decoder_at(lon: f64, lat: f64) -> AisDecoder {
        AisDecoder::new(new_streamp(), 'A', 1, lon, lat)
    }

    const TYPE1: &str = "13u?etPv2;0n?nNKJr?KHqQ20<0<";

    #[test]
    fn type1_decode() {
        // Observer placed on the reported position, so distance and
        // bearing are exactly zero.
        let d = decoder_at(7110351.0 / 600000.0, 28752445.0 / 600000.0);
        let report = d.decode(TYPE1).unwrap();
        for want in [
            "AIS VHF maritime channel 87B (161.975 MHz)\n",
            "Mobile Marine Service Identifier: 265547250\n",
            "Position Report Class A\n",
            "Navigation Status: Under way using engine\n",
            "Rate of Turn: Left at 2.857°/min\n",
            "Speed Over Ground: 13.9 knots\n",
            "Longitude: E 11° 51' 2.106\" (11.850585°)\n",
            "Latitude : N 47° 55' 14.670\" (47.920742°)\n",
            "Distance 0.000 M (0 m) and bearing 0.0° to vessel\n",
            "Course Over Ground: 291.5°\n",
            "True Heading: 304°\n",
            "Time Stamp: 33 seconds\n",
            "Receiver Autonomous Integrity Monitoring: RAIM not in use\n",
        ] {
            assert!(report.contains(want), "missing {want:?} in:\n{report}");
        }
        // Maneuver indicator is zero and must be omitted.
        assert!(!report.contains("Maneuver"));
    }

    #[test]
    fn type5_header() {
        let d = decoder_at(0.0, 0.0);
        // Truncated type 5: header decodes, fields are skipped
        // because of the size mismatch.
        let report = d.decode("55?MbV42;H;4=<D").unwrap();
        assert!(report.contains("Mobile Marine Service Identifier: 351759000\n"));
        assert!(report.contains("Static and Voyage Related Data\n"));
        assert!(!report.contains("IMO Number"));
    }

    #[test]
    fn channel_b_frequency() {
        let d = AisDecoder::new(new_streamp(), 'B', 1, 0.0, 0.0);
        let report = d.decode(TYPE1).unwrap();
        assert!(report.contains("AIS VHF maritime channel 88B (162.025 MHz)\n"));
    }

    #[test]
    fn sentinel_boundaries() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 28];
        pack(&mut sym, 0, 6, 1);
        pack(&mut sym, 50, 10, 1023); // SOG not available
        pack(&mut sym, 116, 12, 3600); // COG not available
        pack(&mut sym, 128, 9, 511); // heading not available
        pack(&mut sym, 42, 8, 127); // ROT hard right
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(!report.contains("Speed Over Ground"));
        assert!(!report.contains("Course Over Ground"));
        assert!(!report.contains("True Heading"));
        assert!(report.contains("Rate of Turn: Right at more than 5° per 30 second\n"));

        pack(&mut sym, 42, 8, 129); // -127: hard left
        pack(&mut sym, 50, 10, 1022); // 102.2 knots or more
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(report.contains("Rate of Turn: Left at more than 5° per 30 second\n"));
        assert!(report.contains("Speed Over Ground: 102.2 or more\n"));
    }

    #[test]
    fn southern_western_position() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 28];
        pack(&mut sym, 0, 6, 1);
        pack(&mut sym, 50, 10, 1023);
        pack(&mut sym, 116, 12, 3600);
        pack(&mut sym, 128, 9, 511);
        // 46.5° W, 23.5° S, as two's complement.
        let lon = (-46.5 * 600000.0) as i32;
        let lat = (-23.5 * 600000.0) as i32;
        pack(&mut sym, 61, 28, (lon as u32) & 0x0fffffff);
        pack(&mut sym, 89, 27, (lat as u32) & 0x07ffffff);
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(report.contains("Longitude: W 46° 30' 0.000\" (-46.500000°)\n"), "{report}");
        assert!(report.contains("Latitude : S 23° 30' 0.000\" (-23.500000°)\n"), "{report}");
    }

    #[test]
    fn out_of_range_position_suppressed() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 28];
        pack(&mut sym, 0, 6, 1);
        // 181 degrees east does not exist.
        pack(&mut sym, 61, 28, (181.0f64 * 600000.0) as u32);
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(!report.contains("Longitude"), "{report}");
    }

    #[test]
    fn type4_utc() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 28];
        pack(&mut sym, 0, 6, 4);
        pack(&mut sym, 38, 14, 2012);
        pack(&mut sym, 52, 4, 3);
        pack(&mut sym, 56, 5, 14);
        pack(&mut sym, 61, 5, 11);
        pack(&mut sym, 66, 6, 30);
        pack(&mut sym, 72, 6, 5);
        pack(&mut sym, 79, 28, 0x6791AC); // in range
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(report.contains("Base Station Report\n"));
        assert!(report.contains("2012-03-14 11:30:05 UTC\n"), "{report}");
    }

    #[test]
    fn type24_part_a_name() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 26];
        pack(&mut sym, 0, 6, 24);
        pack(&mut sym, 38, 2, 0);
        // "HELGA" in the 6-bit alphabet.
        for (i, v) in [8u32, 5, 12, 7, 1].into_iter().enumerate() {
            pack(&mut sym, 40 + i * 6, 6, v);
        }
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(report.contains("Static Data Report\n"));
        assert!(report.contains("Ship Name: HELGA\n"), "{report}");
    }

    #[test]
    fn type27_long_range() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 16];
        pack(&mut sym, 0, 6, 27);
        pack(&mut sym, 40, 4, 5); // moored
        // 10.5 E, 55.25 N at reduced precision (tenths of minutes).
        pack(&mut sym, 44, 18, (10.5f64 * 600.0) as u32);
        pack(&mut sym, 62, 17, (55.25f64 * 600.0) as u32);
        pack(&mut sym, 79, 6, 12);
        pack(&mut sym, 85, 9, 234);
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(report.contains("Position Report For Long-Range Applications\n"));
        assert!(report.contains("Navigation Status: Moored\n"));
        assert!(report.contains("(10.500000°)"), "{report}");
        assert!(report.contains("(55.250000°)"), "{report}");
        assert!(report.contains("Speed Over Ground: 12 knots\n"));
        assert!(report.contains("Course Over Ground: 234°\n"));
    }

    #[test]
    fn type18_flags() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 28];
        pack(&mut sym, 0, 6, 18);
        pack(&mut sym, 46, 10, 55);
        pack(&mut sym, 112, 12, 3600);
        pack(&mut sym, 124, 9, 511);
        pack(&mut sym, 133, 6, 7);
        pack(&mut sym, 143, 1, 1); // DSC equipped
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(report.contains("Standard Class B Carrier Sense Position Report\n"));
        assert!(report.contains("Speed Over Ground: 5.5 knots\n"));
        assert!(report.contains("Time Stamp: 7 UTC seconds\n"));
        assert!(report.contains(
            "VHF Digital Selective Calling: Equipped with DSC function (dedicated or time-shared)\n"
        ));
        assert!(report.contains("Carrier Sense Unit: Class B SOTDMA\n"));
    }

    #[test]
    fn dimensions_or_greater() {
        let d = decoder_at(0.0, 0.0);
        let mut sym = vec![0u8; 70];
        pack(&mut sym, 0, 6, 5);
        pack(&mut sym, 240, 9, 511);
        pack(&mut sym, 249, 9, 120);
        pack(&mut sym, 258, 6, 63);
        // Port dimension zero: omitted.
        let report = d.decode(&armor_all(&sym)).unwrap();
        assert!(report.contains("Dimension to Bow: 511 m or greater\n"));
        assert!(report.contains("Dimension to Stern: 120 m\n"));
        assert!(!report.contains("Dimension to Port"));
        assert!(report.contains("Dimension to Starboard: 63 m or greater\n"));
    }

    #[test]
    fn unknown_type_suppressed() {
        let d = decoder_at(0.0, 0.0);
        assert!(d.decode(&armor_all(&[28, 0, 0])).is_none());
        // With the best-effort bit it comes through annotated.
        let d = AisDecoder::new(new_streamp(), 'A', 3, 0.0, 0.0);
        let report = d.decode(&armor_all(&[28, 0, 0, 0, 0, 0, 0])).unwrap();
        assert!(report.contains("Unknown AIS report type 28\n"));
    }

    #[test]
    fn work_emits_sentence_and_report() -> Result<()> {
        let src = new_streamp();
        src.lock()?.push_tagged(
            TYPE1.to_string(),
            &[Tag::new(0, "crc_ok", TagValue::Bool(true))],
        );
        let mut b = AisDecoder::new(src, 'A', 1, 0.0, 0.0);
        let out = b.out();
        b.work()?;
        let mut o = out.lock()?;
        let (sentence, _) = o.pop().unwrap();
        assert_eq!(sentence, "!AIVDM,1,1,,A,13u?etPv2;0n?nNKJr?KHqQ20<0<,0*4C");
        let (report, _) = o.pop().unwrap();
        assert!(report.contains("Position Report Class A"));
        assert!(o.pop().is_none());
        Ok(())
    }

    #[test]
    fn crc_failed_frame_annotated_not_decoded() -> Result<()> {
        let src = new_streamp();
        src.lock()?.push_tagged(
            TYPE1.to_string(),
            &[Tag::new(0, "crc_ok", TagValue::Bool(false))],
        );
        let mut b = AisDecoder::new(src, 'A', 2, 0.0, 0.0);
        let out = b.out();
        b.work()?;
        let mut o = out.lock()?;
        let (sentence, _) = o.pop().unwrap();
        assert!(sentence.ends_with(" <- CRC Failed!"), "{sentence}");
        assert!(o.pop().is_none());
        Ok(())
    }
}
