//! Order-preserving fixed-width encodings.
//!
//! Values encoded here compare bytewise in the same order as the
//! original numbers, so they can be concatenated in front of other key
//! material and still sort correctly.

const SIGN_FLIP_MASK: u64 = 1u64 << 63;

/// Encodes an `i64` so that byte order equals numeric order.
#[must_use]
pub fn encode_i64(value: i64) -> [u8; 8] {
    (value as u64 ^ SIGN_FLIP_MASK).to_be_bytes()
}

/// Inverse of [`encode_i64`].
#[must_use]
pub fn decode_i64(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_FLIP_MASK) as i64
}

/// Encodes an `f64` so that byte order equals `total_cmp` order.
#[must_use]
pub fn encode_f64(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let flipped = if bits & SIGN_FLIP_MASK == 0 {
        bits ^ SIGN_FLIP_MASK
    } else {
        !bits
    };
    flipped.to_be_bytes()
}

/// Inverse of [`encode_f64`].
#[must_use]
pub fn decode_f64(bytes: [u8; 8]) -> f64 {
    let flipped = u64::from_be_bytes(bytes);
    let bits = if flipped & SIGN_FLIP_MASK != 0 {
        flipped ^ SIGN_FLIP_MASK
    } else {
        !flipped
    };
    f64::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn i64_extremes() {
        assert!(encode_i64(i64::MIN) < encode_i64(-1));
        assert!(encode_i64(-1) < encode_i64(0));
        assert!(encode_i64(0) < encode_i64(i64::MAX));
        assert_eq!(decode_i64(encode_i64(i64::MIN)), i64::MIN);
    }

    #[test]
    fn f64_signs() {
        assert!(encode_f64(-1.0) < encode_f64(-0.5));
        assert!(encode_f64(-0.5) < encode_f64(0.0));
        assert!(encode_f64(0.0) < encode_f64(3.25));
        assert_eq!(decode_f64(encode_f64(-7.5)), -7.5);
    }

    proptest! {
        #[test]
        fn i64_order_preserved(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(a.cmp(&b), encode_i64(a).cmp(&encode_i64(b)));
        }

        #[test]
        fn f64_order_preserved(a in -1e12f64..1e12, b in -1e12f64..1e12) {
            prop_assert_eq!(a.total_cmp(&b), encode_f64(a).cmp(&encode_f64(b)));
        }
    }
}
