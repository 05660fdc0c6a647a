//! Adler-32 checksums over serialized markup.
//!
//! Server-rendered markup carries the checksum of its own serialization on the
//! root element so a client mount can decide whether the existing nodes can be
//! adopted as-is.

use crate::markup::Markup;

/// Attribute carrying the markup checksum on a server-rendered root.
pub const CHECKSUM_ATTR: &str = "data-valor-checksum";

const MOD_ADLER: u32 = 65_521;
/// Largest run of bytes before the sums must be reduced to stay within `u32`.
const NMAX: usize = 5_552;

/// Adler-32 of `data`.
pub fn adler32(data: &[u8]) -> u32 {
    let mut low: u32 = 1;
    let mut high: u32 = 0;
    for chunk in data.chunks(NMAX) {
        for byte in chunk {
            low += u32::from(*byte);
            high += low;
        }
        low %= MOD_ADLER;
        high %= MOD_ADLER;
    }
    (high << 16) | low
}

/// Checksum `markup` as serialized and stamp it on the root element.
/// Returns the checksum. Text roots are returned unstamped.
pub fn add_checksum(markup: &mut Markup) -> u32 {
    let checksum = adler32(markup.to_html().as_bytes());
    markup.set_attr(CHECKSUM_ATTR, checksum.to_string());
    checksum
}

/// Whether `markup` reproduces `existing`.
///
/// `existing` is the root of previously rendered markup. Its stored checksum
/// is compared against a fresh checksum of `markup`; nodes without a stored
/// checksum never match.
pub fn can_reuse(existing: &Markup, markup: &Markup) -> bool {
    let Some(stored) = existing
        .attribute(CHECKSUM_ATTR)
        .and_then(|value| value.parse::<u32>().ok())
    else {
        return false;
    };
    stored == adler32(markup.to_html().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_values() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn long_input_does_not_overflow() {
        let data = vec![0xFF_u8; 100_000];
        let sum = adler32(&data);
        assert!(sum & 0xFFFF < MOD_ADLER);
        assert!(sum >> 16 < MOD_ADLER);
    }

    #[test]
    fn stamped_markup_can_be_reused() {
        let fresh = Markup::element("div").with_child(Markup::text("Hello world"));
        let mut stamped = fresh.clone();
        add_checksum(&mut stamped);
        assert!(can_reuse(&stamped, &fresh));

        let different = Markup::element("div").with_child(Markup::text("Goodbye world"));
        assert!(!can_reuse(&stamped, &different));
        assert!(!can_reuse(&fresh, &fresh));
    }
}
