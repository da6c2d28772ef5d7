//! Order-preserving encoding for sorted-set scores.
//!
//! IEEE 754 bit patterns do not sort numerically when compared as bytes. The
//! sortable form flips every bit of a negative number and only the sign bit of
//! a positive one; written big-endian, byte order then matches numeric order.

/// Encodes `value` so that big-endian byte comparison matches numeric order.
#[inline]
pub const fn encode_f64_sortable(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000_0000_0000
    }
}

#[inline]
pub const fn decode_f64_sortable(sortable: u64) -> f64 {
    let bits = if sortable & 0x8000_0000_0000_0000 != 0 {
        sortable ^ 0x8000_0000_0000_0000
    } else {
        !sortable
    };
    f64::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_f64_values() {
        let values = [
            f64::NEG_INFINITY,
            -1000.5,
            -1.0,
            -0.0,
            0.0,
            1.0,
            1000.5,
            f64::INFINITY,
        ];

        for value in values {
            let decoded = decode_f64_sortable(encode_f64_sortable(value));
            assert_eq!(decoded.to_bits(), value.to_bits(), "roundtrip failed for {}", value);
        }
    }

    #[test]
    fn should_preserve_f64_ordering() {
        let values = [f64::NEG_INFINITY, -1000.5, -1.0, 0.0, 1.0, 1000.5, f64::INFINITY];

        for window in values.windows(2) {
            let (a, b) = (window[0], window[1]);
            assert!(
                encode_f64_sortable(a).to_be_bytes() < encode_f64_sortable(b).to_be_bytes(),
                "ordering violated: {} should sort before {}",
                a,
                b
            );
        }
    }
}
