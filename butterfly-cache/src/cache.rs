//! Generic entity cache keyed by element id

use std::path::Path;

use butterfly_common::{Element, Error, Result};
use rocksdb::{DBIterator, WriteBatch};

use crate::codec::{Codec, NodeCodec, WayCodec};
use crate::keys::{decode_id, encode_id};
use crate::store::{read_error, CacheOptions, Store};

/// Cache of ways keyed by way id
pub type WaysCache = EntityCache<WayCodec>;

/// Cache of node coordinates keyed by node id
pub type CoordsCache = EntityCache<NodeCodec>;

/// Undecoded record produced by [`EntityCache::iter`]
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub id: i64,
    pub data: Vec<u8>,
}

/// An ordered on-disk store of one entity kind, encoded with `C`.
pub struct EntityCache<C: Codec> {
    store: Store,
    codec: C,
}

impl<C: Codec + Default> EntityCache<C> {
    pub fn open<P: AsRef<Path>>(path: P, options: &CacheOptions) -> Result<Self> {
        Self::with_codec(path, options, C::default())
    }
}

impl<C: Codec> EntityCache<C> {
    pub fn with_codec<P: AsRef<Path>>(path: P, options: &CacheOptions, codec: C) -> Result<Self> {
        Ok(Self {
            store: Store::open(path, options)?,
            codec,
        })
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn put(&self, item: &C::Item) -> Result<()> {
        let data = self.codec.marshal(item)?;
        self.store.put(&encode_id(item.id()), &data)
    }

    /// Write all items in one atomic batch. Every item is encoded before
    /// anything is written, so an encoding failure leaves the store untouched.
    pub fn put_batch(&self, items: &[C::Item]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for item in items {
            let data = self.codec.marshal(item)?;
            batch.put(encode_id(item.id()), data);
        }
        self.store.write(batch)
    }

    /// Fetch and decode one item. The returned item carries `id` regardless
    /// of the payload content.
    pub fn get(&self, id: i64) -> Result<C::Item> {
        let data = self.store.get(&encode_id(id))?.ok_or(Error::NotFound {
            kind: <C::Item as Element>::KIND,
            id,
        })?;
        let mut item = self.codec.unmarshal(&data)?;
        item.set_id(id);
        Ok(item)
    }

    /// Decode a record produced by [`EntityCache::iter`]
    pub fn decode(&self, raw: &RawItem) -> Result<C::Item> {
        let mut item = self.codec.unmarshal(&raw.data)?;
        item.set_id(raw.id);
        Ok(item)
    }

    /// Stream all records in ascending id order.
    ///
    /// The iterator reads a point-in-time view of the store and releases its
    /// cursor when dropped, whether or not it was drained.
    pub fn iter(&self) -> CacheIter<'_> {
        CacheIter {
            inner: self.store.scan(),
        }
    }

    /// Close the underlying store
    pub fn close(self) {
        drop(self);
    }
}

/// Forward cursor over a cache, see [`EntityCache::iter`]
pub struct CacheIter<'a> {
    inner: DBIterator<'a>,
}

impl Iterator for CacheIter<'_> {
    type Item = Result<RawItem>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(read_error(e))),
        };
        let (key, value) = entry;
        Some(decode_id(&key).map(|id| RawItem {
            id,
            data: value.into_vec(),
        }))
    }
}
