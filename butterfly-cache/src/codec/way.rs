//! Way payload format
//!
//! ```text
//! n_tags: uvarint
//! for each tag:
//!   key:   uvarint len + UTF-8 bytes
//!   value: uvarint len + UTF-8 bytes
//! n_refs: uvarint
//! for each ref:
//!   delta to previous ref: zigzag varint (first ref is relative to 0)
//! ```
//!
//! A zero-length payload is a way without tags or refs, and a payload ending
//! right after the tag section is a way without refs. Anything else that
//! ends early, overruns a count, or leaves trailing bytes is rejected.

use butterfly_common::{Error, Result, Tags, Way};

use super::varint::{put_bytes, put_uvarint, put_varint, Reader};
use super::Codec;

// Smallest encodings: a tag is two empty strings, a ref is a one-byte delta.
const MIN_TAG_LEN: usize = 2;
const MIN_REF_LEN: usize = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct WayCodec;

impl Codec for WayCodec {
    type Item = Way;

    fn marshal(&self, way: &Way) -> Result<Vec<u8>> {
        let tag_bytes: usize = way.tags.iter().map(|(k, v)| k.len() + v.len() + 4).sum();
        let mut buf = Vec::with_capacity(tag_bytes + way.refs.len() * 3 + 4);

        put_uvarint(&mut buf, way.tags.len() as u64);
        for (key, value) in &way.tags {
            put_bytes(&mut buf, key.as_bytes());
            put_bytes(&mut buf, value.as_bytes());
        }

        put_uvarint(&mut buf, way.refs.len() as u64);
        let mut prev = 0i64;
        for &node_id in &way.refs {
            put_varint(&mut buf, node_id.wrapping_sub(prev));
            prev = node_id;
        }

        Ok(buf)
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Way> {
        let mut way = Way::default();
        let mut reader = Reader::new(data);
        if reader.is_empty() {
            return Ok(way);
        }

        let n_tags = reader.count(MIN_TAG_LEN, "tag")?;
        let mut tags = Tags::new();
        for _ in 0..n_tags {
            let key = reader.string()?;
            let value = reader.string()?;
            if tags.insert(key, value).is_some() {
                return Err(Error::CorruptRecord("duplicate tag key".to_string()));
            }
        }
        way.tags = tags;

        if reader.is_empty() {
            return Ok(way);
        }

        let n_refs = reader.count(MIN_REF_LEN, "ref")?;
        let mut refs = Vec::with_capacity(n_refs);
        let mut prev = 0i64;
        for _ in 0..n_refs {
            prev = prev.wrapping_add(reader.varint()?);
            refs.push(prev);
        }
        way.refs = refs;

        if !reader.is_empty() {
            return Err(Error::CorruptRecord(format!(
                "{} trailing bytes after way refs",
                reader.remaining()
            )));
        }

        Ok(way)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_way() -> Way {
        let mut tags = Tags::new();
        tags.insert("highway".to_string(), "residential".to_string());
        tags.insert("name".to_string(), "Rue de la Loi".to_string());
        Way::new(100, vec![7_000_000_001, 7_000_000_005, 6_999_999_990, 1], tags)
    }

    #[test]
    fn test_way_roundtrip_drops_id() {
        let way = sample_way();
        let data = WayCodec.marshal(&way).unwrap();
        let decoded = WayCodec.unmarshal(&data).unwrap();

        assert_eq!(decoded.id, 0);
        assert_eq!(decoded.tags, way.tags);
        assert_eq!(decoded.refs, way.refs);
        assert!(decoded.nodes.is_empty());
    }

    #[test]
    fn test_empty_payload_is_empty_way() {
        let way = WayCodec.unmarshal(&[]).unwrap();
        assert!(way.tags.is_empty());
        assert!(way.refs.is_empty());
    }

    #[test]
    fn test_missing_ref_section_is_tolerated() {
        let mut way = sample_way();
        way.refs.clear();
        let data = WayCodec.marshal(&way).unwrap();
        // drop the trailing zero ref count
        let decoded = WayCodec.unmarshal(&data[..data.len() - 1]).unwrap();
        assert_eq!(decoded.tags, way.tags);
        assert!(decoded.refs.is_empty());
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let data = WayCodec.marshal(&sample_way()).unwrap();
        for cut in 1..data.len() {
            let truncated = &data[..cut];
            // The only prefix that decodes is the end of the tag section.
            if let Ok(way) = WayCodec.unmarshal(truncated) {
                assert!(way.refs.is_empty(), "cut at {cut} decoded partial refs");
                assert_eq!(way.tags.len(), 2);
            }
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut data = WayCodec.marshal(&sample_way()).unwrap();
        data.push(0);
        assert!(matches!(
            WayCodec.unmarshal(&data),
            Err(Error::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_inflated_count_rejected() {
        // claims 200 tags, carries none
        let data = [200u8, 1];
        assert!(matches!(
            WayCodec.unmarshal(&data),
            Err(Error::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_empty_key_and_value_roundtrip() {
        let mut tags = Tags::new();
        tags.insert(String::new(), "x".to_string());
        tags.insert("note".to_string(), String::new());
        let way = Way::new(9, vec![1, 2], tags);

        let data = WayCodec.marshal(&way).unwrap();
        let decoded = WayCodec.unmarshal(&data).unwrap();
        assert_eq!(decoded.tags, way.tags);
        assert_eq!(decoded.refs, vec![1, 2]);
    }
}
