/*! NMEA 0183 sentence construction.

Decoded AIS frames travel on as `!AIVDM` sentences: the armored
payload wrapped in a comma separated envelope with an XOR checksum.

Strictly speaking NMEA sentences are limited to 82 characters, and the
448-bit type 5 messages come out longer than that. This crate emits
them as a single oversized sentence anyway; gpsd and most other
consumers accept that.
*/

/// XOR checksum over every byte of the sentence body (the part
/// strictly between `!` and `*`).
#[must_use]
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |sum, b| sum ^ b)
}

/// Build a single-fragment `!AIVDM` sentence around an armored
/// payload. `designator` is the receive channel, `'A'` or `'B'`; the
/// trailing `0` is the fill bit count.
#[must_use]
pub fn aivdm(designator: char, armored: &str) -> String {
    let body = format!("AIVDM,1,1,,{designator},{armored},0");
    format!("!{body}*{:02X}", checksum(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_checksum() {
        assert_eq!(checksum("AIVDM,1,1,,A,13u?etPv2;0n?nNKJr?KHqQ20<0<,0"), 0x4C);
    }

    #[test]
    fn sentence_format() {
        let s = aivdm('A', "13u?etPv2;0n?nNKJr?KHqQ20<0<");
        assert_eq!(s, "!AIVDM,1,1,,A,13u?etPv2;0n?nNKJr?KHqQ20<0<,0*4C");
    }

    #[test]
    fn checksum_invariant() {
        for payload in ["13u?etPv2;0n?nNKJr?KHqQ20<0<", "E", "55?MbV42;H;4=<D"] {
            for d in ['A', 'B'] {
                let s = aivdm(d, payload);
                let star = s.find('*').unwrap();
                let want = u8::from_str_radix(&s[star + 1..], 16).unwrap();
                assert_eq!(checksum(&s[1..star]), want, "{s}");
            }
        }
    }
}
