//! Node payload: fixed-point longitude and latitude
//!
//! ```text
//! lon_fxp: i32 big-endian (1e-7 degrees)
//! lat_fxp: i32 big-endian (1e-7 degrees)
//! ```

use butterfly_common::{EntityKind, Error, Node, Result};

use super::Codec;

const SCALE: f64 = 10_000_000.0; // 1e-7 degrees
const RECORD_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCodec;

fn to_fixed(degrees: f64, limit: f64) -> Option<i32> {
    if !degrees.is_finite() || degrees.abs() > limit {
        return None;
    }
    Some((degrees * SCALE).round() as i32)
}

impl Codec for NodeCodec {
    type Item = Node;

    fn marshal(&self, node: &Node) -> Result<Vec<u8>> {
        let (Some(lon), Some(lat)) = (to_fixed(node.lon, 180.0), to_fixed(node.lat, 90.0)) else {
            return Err(Error::Encode {
                kind: EntityKind::Node,
                id: node.id,
                reason: format!("coordinate out of range: {}, {}", node.lon, node.lat),
            });
        };

        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.extend_from_slice(&lon.to_be_bytes());
        buf.extend_from_slice(&lat.to_be_bytes());
        Ok(buf)
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Node> {
        if data.len() != RECORD_SIZE {
            return Err(Error::CorruptRecord(format!(
                "node record is {} bytes, expected {RECORD_SIZE}",
                data.len()
            )));
        }
        let lon = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let lat = i32::from_be_bytes([data[4], data[5], data[6], data[7]]);

        Ok(Node {
            id: 0,
            lon: f64::from(lon) / SCALE,
            lat: f64::from(lat) / SCALE,
        })
    }
}
