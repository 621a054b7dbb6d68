//! LEB128 varints and a bounds-checked payload reader

use butterfly_common::{Error, Result};

const MAX_VARINT_LEN: usize = 10;

pub(crate) fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Zigzag-encoded signed varint
pub(crate) fn put_varint(buf: &mut Vec<u8>, value: i64) {
    put_uvarint(buf, ((value << 1) ^ (value >> 63)) as u64);
}

pub(crate) fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_uvarint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Cursor over a stored payload. Every read fails closed on truncation.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn uvarint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(Error::CorruptRecord(format!(
                    "truncated varint at offset {}",
                    self.pos
                )));
            };
            self.pos += 1;

            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(Error::CorruptRecord("varint overflows u64".to_string()));
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte < 0x80 {
                return Ok(value);
            }
        }
        Err(Error::CorruptRecord("varint overflows u64".to_string()))
    }

    pub(crate) fn varint(&mut self) -> Result<i64> {
        let raw = self.uvarint()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    /// Read a count and reject it if the payload cannot possibly hold that
    /// many entries of at least `min_entry_len` bytes each.
    pub(crate) fn count(&mut self, min_entry_len: usize, what: &str) -> Result<usize> {
        let count = self.uvarint()?;
        let max = (self.remaining() / min_entry_len.max(1)) as u64;
        if count > max {
            return Err(Error::CorruptRecord(format!(
                "{what} count {count} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(count as usize)
    }

    pub(crate) fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.uvarint()?;
        if len > self.remaining() as u64 {
            return Err(Error::CorruptRecord(format!(
                "length {len} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        let start = self.pos;
        self.pos += len as usize;
        Ok(&self.data[start..self.pos])
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::CorruptRecord(format!("invalid UTF-8 in string: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uvarint_boundaries() {
        for value in [0u64, 1, 127, 128, 16_383, 16_384, u64::MAX] {
            let mut buf = Vec::new();
            put_uvarint(&mut buf, value);
            let mut reader = Reader::new(&buf);
            assert_eq!(reader.uvarint().unwrap(), value);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_zigzag_negative() {
        let mut buf = Vec::new();
        put_varint(&mut buf, -1);
        assert_eq!(buf, vec![1]);
        put_varint(&mut buf, i64::MIN);
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.varint().unwrap(), -1);
        assert_eq!(reader.varint().unwrap(), i64::MIN);
    }

    #[test]
    fn test_truncated_varint() {
        let mut reader = Reader::new(&[0x80, 0x80]);
        assert!(matches!(reader.uvarint(), Err(Error::CorruptRecord(_))));
    }

    #[test]
    fn test_overlong_varint() {
        let data = [0xff; 11];
        let mut reader = Reader::new(&data);
        assert!(reader.uvarint().is_err());
    }

    #[test]
    fn test_bytes_length_past_end() {
        let mut buf = Vec::new();
        put_uvarint(&mut buf, 10);
        buf.extend_from_slice(b"abc");
        let mut reader = Reader::new(&buf);
        assert!(reader.bytes().is_err());
    }
}
