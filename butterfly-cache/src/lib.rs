//! Butterfly-cache library
//!
//! On-disk caches for OSM elements backed by RocksDB: fixed-width id keys,
//! compact per-kind payload codecs, atomic batch writes, ordered streaming
//! and a presence index for deduplication across runs.

pub mod cache;
pub mod codec;
pub mod coords;
pub mod existence;
pub mod keys;
pub mod osm_cache;
pub mod store;

pub use cache::{CacheIter, CoordsCache, EntityCache, RawItem, WaysCache};
pub use codec::{Codec, NodeCodec, WayCodec};
pub use coords::CoordinateResolver;
pub use existence::ExistenceIndex;
pub use osm_cache::{OsmCache, OsmCacheOptions};
pub use store::{CacheOptions, CacheOverrides};
