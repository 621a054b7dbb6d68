//! RocksDB store handle shared by all cache kinds

use std::path::{Path, PathBuf};

use butterfly_common::{Error, Result};
use log::debug;
use rocksdb::{
    DBCompressionType, DBIterator, ErrorKind, IteratorMode, Options, ReadOptions, WriteBatch,
    WriteOptions, DB,
};
use serde::Deserialize;

use crate::keys::Key;

/// Tuning for one store instance
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    pub write_buffer_size_mb: usize,
    pub max_open_files: i32,
    pub compression: bool,
    pub sync_writes: bool,
    pub parallelism: i32,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_open_files: 256,
            compression: true,
            sync_writes: false,
            parallelism: num_threads(),
        }
    }
}

impl CacheOptions {
    /// Coordinates are small fixed records written in bulk
    pub fn coords() -> Self {
        Self {
            write_buffer_size_mb: 128,
            compression: false,
            ..Self::default()
        }
    }

    pub fn ways() -> Self {
        Self::default()
    }

    /// Presence markers only
    pub fn inserted() -> Self {
        Self {
            write_buffer_size_mb: 16,
            max_open_files: 64,
            compression: false,
            ..Self::default()
        }
    }

    /// Replace the fields set in `overrides`, keeping the rest
    pub fn with_overrides(mut self, overrides: &CacheOverrides) -> Self {
        if let Some(size) = overrides.write_buffer_size_mb {
            self.write_buffer_size_mb = size;
        }
        if let Some(files) = overrides.max_open_files {
            self.max_open_files = files;
        }
        if let Some(compression) = overrides.compression {
            self.compression = compression;
        }
        if let Some(sync) = overrides.sync_writes {
            self.sync_writes = sync;
        }
        if let Some(parallelism) = overrides.parallelism {
            self.parallelism = parallelism;
        }
        self
    }

    fn to_rocksdb(&self) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(self.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_open_files(self.max_open_files);
        opts.increase_parallelism(self.parallelism.max(1));
        opts.set_compression_type(if self.compression {
            DBCompressionType::Zstd
        } else {
            DBCompressionType::None
        });
        opts
    }
}

fn num_threads() -> i32 {
    num_cpus::get() as i32
}

/// Partial [`CacheOptions`] as written in a configuration file.
///
/// Unset fields keep the value of the preset they are applied to.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOverrides {
    pub write_buffer_size_mb: Option<usize>,
    pub max_open_files: Option<i32>,
    pub compression: Option<bool>,
    pub sync_writes: Option<bool>,
    pub parallelism: Option<i32>,
}

/// Open RocksDB instance plus the options every call needs.
///
/// `DB` allows concurrent reads and writes without external locking, so a
/// single `Store` is shared by reference across worker threads.
pub struct Store {
    db: DB,
    path: PathBuf,
    sync_writes: bool,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P, options: &CacheOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = DB::open(&options.to_rocksdb(), &path).map_err(|e| Error::Open {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!("opened cache store at {}", path.display());

        Ok(Self {
            db,
            path,
            sync_writes: options.sync_writes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_options(&self) -> WriteOptions {
        let mut wo = WriteOptions::default();
        wo.set_sync(self.sync_writes);
        wo
    }

    pub(crate) fn put(&self, key: &Key, value: &[u8]) -> Result<()> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| Error::StoreWrite(e.to_string()))
    }

    /// Apply a batch atomically
    pub(crate) fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| Error::StoreWrite(e.to_string()))
    }

    pub(crate) fn get(&self, key: &Key) -> Result<Option<Vec<u8>>> {
        self.db
            .get_opt(key, &ReadOptions::default())
            .map_err(read_error)
    }

    /// Forward iterator over an implicit snapshot, bypassing the block cache.
    pub(crate) fn scan(&self) -> DBIterator<'_> {
        let mut ro = ReadOptions::default();
        ro.set_fill_cache(false);
        self.db.iterator_opt(IteratorMode::Start, ro)
    }

    /// Delete the store files at `path`. The store must not be open.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        DB::destroy(&Options::default(), path.as_ref())
            .map_err(|e| Error::StoreWrite(e.to_string()))
    }
}

/// A corrupt block only loses the records it holds; anything else means the
/// store itself is failing.
pub(crate) fn read_error(e: rocksdb::Error) -> Error {
    classify_read(e.kind(), e.to_string())
}

fn classify_read(kind: ErrorKind, message: String) -> Error {
    match kind {
        ErrorKind::Corruption => Error::CorruptRecord(message),
        _ => Error::StoreRead(message),
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        debug!("closing cache store at {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_is_per_record() {
        let err = classify_read(
            ErrorKind::Corruption,
            "Corruption: block checksum mismatch".to_string(),
        );
        assert!(matches!(err, Error::CorruptRecord(_)));
        assert!(!err.is_fatal());

        let err = classify_read(
            ErrorKind::IOError,
            "IO error: No such file or directory".to_string(),
        );
        assert!(matches!(err, Error::StoreRead(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_overrides_keep_preset_fields() {
        let overrides = CacheOverrides {
            write_buffer_size_mb: Some(256),
            ..Default::default()
        };
        let coords = CacheOptions::coords().with_overrides(&overrides);

        assert_eq!(coords.write_buffer_size_mb, 256);
        assert!(!coords.compression);
        assert_eq!(coords.max_open_files, CacheOptions::coords().max_open_files);

        let inserted = CacheOptions::inserted().with_overrides(&CacheOverrides {
            sync_writes: Some(true),
            ..Default::default()
        });
        assert!(inserted.sync_writes);
        assert_eq!(inserted.max_open_files, 64);
        assert_eq!(inserted.write_buffer_size_mb, 16);
    }
}
