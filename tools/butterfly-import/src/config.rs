//! Import configuration
//!
//! ```yaml
//! cache_dir: /var/cache/butterfly
//! mapping: mapping.yml
//! clip: belgium.geojson
//! projection: webmercator
//! workers: 0            # 0 = one per CPU
//! channel_capacity: 1024
//! batch_size: 5000
//! mark_inserted: false
//! caches:
//!   coords: { write_buffer_size_mb: 256 }
//! ```

use std::path::{Path, PathBuf};

use butterfly_cache::OsmCacheOptions;
use butterfly_common::{Error, Result};
use serde::Deserialize;

use crate::ingest::BATCH_SIZE;
use crate::proj::ProjectionKind;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub cache_dir: PathBuf,
    pub mapping: Option<PathBuf>,
    pub clip: Option<PathBuf>,
    pub projection: ProjectionKind,
    pub workers: usize,
    pub channel_capacity: usize,
    pub batch_size: usize,
    pub mark_inserted: bool,
    pub caches: OsmCacheOptions,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("butterfly-cache"),
            mapping: None,
            clip: None,
            projection: ProjectionKind::default(),
            workers: 0,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            batch_size: BATCH_SIZE,
            mark_inserted: false,
            caches: OsmCacheOptions::default(),
        }
    }
}

impl ImportConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::InvalidInput(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidInput("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Worker count with 0 resolved to the number of CPUs
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ImportConfig::default());
        assert_eq!(config.projection, ProjectionKind::WebMercator);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_full_config() {
        let config = ImportConfig::from_yaml_str(
            r#"
cache_dir: /tmp/cache
mapping: mapping.yml
clip: area.geojson
projection: wgs84
workers: 3
channel_capacity: 16
batch_size: 100
mark_inserted: true
caches:
  coords:
    write_buffer_size_mb: 256
  inserted_ways:
    sync_writes: true
"#,
        )
        .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(config.clip, Some(PathBuf::from("area.geojson")));
        assert_eq!(config.projection, ProjectionKind::Wgs84);
        assert_eq!(config.worker_count(), 3);
        assert!(config.mark_inserted);
        let presets = OsmCacheOptions::default();
        assert_eq!(config.caches.coords.write_buffer_size_mb, 256);
        assert_eq!(config.caches.coords.compression, presets.coords.compression);
        assert_eq!(config.caches.coords.max_open_files, presets.coords.max_open_files);
        assert_eq!(config.caches.ways, presets.ways);
        assert!(config.caches.inserted_ways.sync_writes);
        assert_eq!(
            config.caches.inserted_ways.max_open_files,
            presets.inserted_ways.max_open_files
        );
        assert_eq!(
            config.caches.inserted_ways.write_buffer_size_mb,
            presets.inserted_ways.write_buffer_size_mb
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ImportConfig::from_yaml_str("channel_capacity: 0").is_err());
        assert!(ImportConfig::from_yaml_str("workerz: 2").is_err());
        assert!(ImportConfig::from_yaml_str("caches: {coords: {buffer: 1}}").is_err());
    }
}
