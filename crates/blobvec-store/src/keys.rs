//! Order-preserving key folding.
//!
//! Relation keys are signed 32-bit integers stored big-endian with the sign
//! bit flipped, so that raw byte comparison matches integer comparison and
//! the tree can order entries without decoding.

use byteorder::{BigEndian, ByteOrder};

pub const FOLDED_KEY_LEN: usize = 4;

pub fn fold_key(key: i32) -> [u8; FOLDED_KEY_LEN] {
    let mut buf = [0u8; FOLDED_KEY_LEN];
    BigEndian::write_u32(&mut buf, (key as u32) ^ 0x8000_0000);
    buf
}

pub fn unfold_key(bytes: [u8; FOLDED_KEY_LEN]) -> i32 {
    (BigEndian::read_u32(&bytes) ^ 0x8000_0000) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for key in [i32::MIN, -1, 0, 1, 42, i32::MAX] {
            assert_eq!(unfold_key(fold_key(key)), key);
        }
    }

    #[test]
    fn byte_order_matches_integer_order() {
        let keys = [i32::MIN, -100, -1, 0, 1, 7, 1000, i32::MAX];
        for pair in keys.windows(2) {
            assert!(fold_key(pair[0]) < fold_key(pair[1]));
        }
    }
}
