//! The logger's 2-byte packed floating point encoding.
//!
//! Bit layout, MSB to LSB: 1 sign bit, 2 exponent-selector bits, 13 mantissa
//! bits. The selector picks a decimal scale, so the encoding covers
//! -8191..=8191 with up to three decimal places.

/// Decimal scale selected by the two exponent bits.
const SCALE: [f64; 4] = [1.0, 1e-1, 1e-2, 1e-3];

/// Decode a packed 2-byte float into an `f64`.
///
/// Total over all 65536 inputs; every bit pattern is a real number.
#[must_use]
pub fn decode_fp2(raw: u16) -> f64 {
    let exponent = usize::from((raw >> 13) & 0x3);
    let mantissa = f64::from(raw & 0x1fff);
    let magnitude = mantissa * SCALE[exponent];
    if raw & 0x8000 == 0 {
        magnitude
    } else {
        -magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0x0000, 0.0; "zero")]
    #[test_case(0x1fff, 8191.0; "max mantissa scale 1")]
    #[test_case(0x3fff, 819.1; "max mantissa scale tenths")]
    #[test_case(0x5fff, 81.91; "max mantissa scale hundredths")]
    #[test_case(0x7fff, 8.191; "max mantissa scale thousandths")]
    #[test_case(0xffff, -8.191; "negative max mantissa")]
    #[test_case(0x2001, 0.1; "one tenth")]
    #[test_case(0x0019, 25.0; "small integer")]
    fn decode(raw: u16, expected: f64) {
        let zult = decode_fp2(raw);
        assert!(
            (zult - expected).abs() < 1e-9,
            "decode_fp2({raw:#06x}) = {zult}, expected {expected}"
        );
    }

    #[test]
    fn sign_bit_flips_sign_only() {
        for raw in [0x0001u16, 0x1fff, 0x2ab3, 0x4cc4, 0x7fff] {
            let pos = decode_fp2(raw);
            let neg = decode_fp2(raw | 0x8000);
            assert_eq!(neg, -pos, "raw={raw:#06x}");
        }
    }

    #[test]
    fn total_over_all_inputs() {
        for raw in 0..=u16::MAX {
            let zult = decode_fp2(raw);
            assert!(zult.is_finite(), "decode_fp2({raw:#06x}) not finite");
            assert!(zult.abs() <= 8191.0, "decode_fp2({raw:#06x}) out of range");
        }
    }

    #[test]
    fn signed_zero_duplicates() {
        assert_eq!(decode_fp2(0x8000), 0.0);
        assert_eq!(decode_fp2(0xa000), 0.0);
    }
}
