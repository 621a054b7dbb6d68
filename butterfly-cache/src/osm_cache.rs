//! The set of caches an import works against, one store per kind

use std::path::{Path, PathBuf};

use butterfly_common::{EntityKind, Result};
use log::info;
use serde::Deserialize;

use crate::cache::{CoordsCache, WaysCache};
use crate::existence::ExistenceIndex;
use crate::store::{CacheOptions, CacheOverrides, Store};

const COORDS_DIR: &str = "coords";
const WAYS_DIR: &str = "ways";
const INSERTED_WAYS_DIR: &str = "inserted_ways";

/// Per-store options for an [`OsmCache`].
///
/// Deserialized as overrides on top of each kind's preset.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(from = "OsmCacheOverrides")]
pub struct OsmCacheOptions {
    pub coords: CacheOptions,
    pub ways: CacheOptions,
    pub inserted_ways: CacheOptions,
}

impl Default for OsmCacheOptions {
    fn default() -> Self {
        Self {
            coords: CacheOptions::coords(),
            ways: CacheOptions::ways(),
            inserted_ways: CacheOptions::inserted(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OsmCacheOverrides {
    coords: CacheOverrides,
    ways: CacheOverrides,
    inserted_ways: CacheOverrides,
}

impl From<OsmCacheOverrides> for OsmCacheOptions {
    fn from(overrides: OsmCacheOverrides) -> Self {
        Self {
            coords: CacheOptions::coords().with_overrides(&overrides.coords),
            ways: CacheOptions::ways().with_overrides(&overrides.ways),
            inserted_ways: CacheOptions::inserted().with_overrides(&overrides.inserted_ways),
        }
    }
}

pub struct OsmCache {
    pub coords: CoordsCache,
    pub ways: WaysCache,
    pub inserted_ways: ExistenceIndex,
    dir: PathBuf,
}

impl OsmCache {
    /// Open (creating if needed) all stores under `dir`
    pub fn open<P: AsRef<Path>>(dir: P, options: &OsmCacheOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let cache = Self {
            coords: CoordsCache::open(dir.join(COORDS_DIR), &options.coords)?,
            ways: WaysCache::open(dir.join(WAYS_DIR), &options.ways)?,
            inserted_ways: ExistenceIndex::open(
                dir.join(INSERTED_WAYS_DIR),
                EntityKind::Way,
                &options.inserted_ways,
            )?,
            dir,
        };
        info!("opened osm cache in {}", cache.dir.display());
        Ok(cache)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Split into the individual stores, e.g. to share them between threads
    pub fn into_parts(self) -> (CoordsCache, WaysCache, ExistenceIndex) {
        (self.coords, self.ways, self.inserted_ways)
    }

    pub fn close(self) {
        info!("closing osm cache in {}", self.dir.display());
    }

    /// Delete all stores under `dir`
    pub fn remove<P: AsRef<Path>>(dir: P) -> Result<()> {
        for name in [COORDS_DIR, WAYS_DIR, INSERTED_WAYS_DIR] {
            let path = dir.as_ref().join(name);
            if path.exists() {
                Store::destroy(&path)?;
                std::fs::remove_dir_all(&path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butterfly_common::{Node, Tags, Way};
    use tempfile::TempDir;

    #[test]
    fn test_open_close_reopen() {
        let dir = TempDir::new().unwrap();
        let cache = OsmCache::open(dir.path(), &OsmCacheOptions::default()).unwrap();
        cache.coords.put(&Node::new(1, 4.0, 50.0)).unwrap();
        cache.ways.put(&Way::new(2, vec![1], Tags::new())).unwrap();
        cache.inserted_ways.mark(2).unwrap();
        cache.close();

        let cache = OsmCache::open(dir.path(), &OsmCacheOptions::default()).unwrap();
        assert_eq!(cache.coords.get(1).unwrap().lon, 4.0);
        assert_eq!(cache.ways.get(2).unwrap().refs, vec![1]);
        assert!(cache.inserted_ways.contains(2).unwrap());
    }

    #[test]
    fn test_into_parts() {
        let dir = TempDir::new().unwrap();
        let cache = OsmCache::open(dir.path(), &OsmCacheOptions::default()).unwrap();
        let (coords, ways, inserted) = cache.into_parts();

        assert!(coords.path().ends_with(COORDS_DIR));
        assert!(ways.path().ends_with(WAYS_DIR));
        assert_eq!(inserted.kind(), EntityKind::Way);
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let cache = OsmCache::open(dir.path(), &OsmCacheOptions::default()).unwrap();
        cache.coords.put(&Node::new(1, 4.0, 50.0)).unwrap();
        cache.close();

        OsmCache::remove(dir.path()).unwrap();
        assert!(!dir.path().join(COORDS_DIR).exists());

        let cache = OsmCache::open(dir.path(), &OsmCacheOptions::default()).unwrap();
        assert!(cache.coords.get(1).unwrap_err().is_not_found());
    }
}
