//! Byte obfuscation used by the R4 SDHC Dual-Core family
//!
//! Every byte committed to that cart is passed through a fixed bit
//! permutation followed by an XOR. The table and constant must not change;
//! the cart's loader undoes exactly this transform.

/// Destination bit of each source bit in [`encode`]
const ENCODE_BITS: [u8; 8] = [6, 2, 7, 3, 1, 0, 4, 5];
/// Destination bit of each source bit in [`decode`]
const DECODE_BITS: [u8; 8] = [5, 4, 1, 3, 6, 7, 0, 2];

const ENCODE_XOR: u8 = 0x2A;
/// `ENCODE_XOR` moved through the decode permutation
const DECODE_XOR: u8 = 0x98;

const fn permute(x: u8, table: &[u8; 8]) -> u8 {
    let mut out = 0;
    let mut bit = 0;
    while bit < 8 {
        out |= ((x >> bit) & 1) << table[bit];
        bit += 1;
    }
    out
}

const _: () = assert!(permute(ENCODE_XOR, &DECODE_BITS) == DECODE_XOR);

/// Obfuscate one byte for the cart
pub const fn encode(x: u8) -> u8 {
    permute(x, &ENCODE_BITS) ^ ENCODE_XOR
}

/// Undo [`encode`]
pub const fn decode(y: u8) -> u8 {
    permute(y, &DECODE_BITS) ^ DECODE_XOR
}

/// Encode `src` into `dst`
///
/// Only the common prefix of the two slices is written.
pub fn encode_into(dst: &mut [u8], src: &[u8]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = encode(s);
    }
}

/// Decode `src` into `dst`
pub fn decode_into(dst: &mut [u8], src: &[u8]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = decode(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(encode(0x00), 0x2A);
        assert_eq!(encode(0xFF), 0xD5);
        assert_eq!(encode(0x01), 0x6A);
        assert_eq!(encode(0x20), 0x2B);
        assert_eq!(decode(0x2A), 0x00);
    }

    #[test]
    fn test_decode_inverts_encode() {
        for x in 0..=255u8 {
            assert_eq!(decode(encode(x)), x, "byte {:#04X}", x);
            assert_eq!(encode(decode(x)), x, "byte {:#04X}", x);
        }
    }

    #[test]
    fn test_encode_into_prefix() {
        let mut dst = [0u8; 3];
        encode_into(&mut dst, &[0x00, 0xFF]);
        assert_eq!(dst, [0x2A, 0xD5, 0x00]);

        let mut back = [0u8; 2];
        decode_into(&mut back, &dst[..2]);
        assert_eq!(back, [0x00, 0xFF]);
    }
}
