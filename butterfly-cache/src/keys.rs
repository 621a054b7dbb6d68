//! Fixed-width cache keys
//!
//! Ids are stored as 8-byte big-endian two's complement, so the byte order
//! of keys equals the numeric order of non-negative ids.

use butterfly_common::{Error, Result};

pub const KEY_LEN: usize = 8;

pub type Key = [u8; KEY_LEN];

pub fn encode_id(id: i64) -> Key {
    id.to_be_bytes()
}

/// Decode a key read back from the store. Fails on any width other than 8.
pub fn decode_id(key: &[u8]) -> Result<i64> {
    let bytes: Key = key.try_into().map_err(|_| Error::CorruptKey(key.len()))?;
    Ok(i64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_roundtrip() {
        for id in [0, 1, 255, 256, 4_294_967_296, i64::MAX] {
            assert_eq!(decode_id(&encode_id(id)).unwrap(), id);
        }
    }

    #[test]
    fn test_key_order_matches_id_order() {
        let ids = [0i64, 1, 2, 255, 256, 65_535, 1 << 40, i64::MAX];
        for pair in ids.windows(2) {
            assert!(encode_id(pair[0]) < encode_id(pair[1]));
        }
    }

    #[test]
    fn test_decode_wrong_width() {
        let err = decode_id(&[0u8; 7]).unwrap_err();
        assert!(matches!(err, Error::CorruptKey(7)));
        assert!(decode_id(&[0u8; 9]).is_err());
        assert!(decode_id(&[]).is_err());
    }
}
