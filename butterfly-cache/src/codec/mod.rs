//! Binary payload codecs, one per cached entity kind
//!
//! Payloads never embed the entity id; the id lives in the cache key and is
//! restored by the cache after decoding.

mod node;
pub(crate) mod varint;
mod way;

pub use node::NodeCodec;
pub use way::WayCodec;

use butterfly_common::{Element, Result};

/// Encode/decode strategy for one entity kind
pub trait Codec: Send + Sync {
    type Item: Element;

    fn marshal(&self, item: &Self::Item) -> Result<Vec<u8>>;

    fn unmarshal(&self, data: &[u8]) -> Result<Self::Item>;
}
