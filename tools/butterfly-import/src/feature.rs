//! Built features and the sinks that receive them

use std::io::{BufWriter, Write};

use butterfly_common::Tags;
use crossbeam_channel::Sender;
use geo::Geometry;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::mapping::{Match, TableType};

/// One output row: a way copy with a built geometry and the tables it matched
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: i64,
    pub kind: TableType,
    pub tags: Tags,
    pub matches: Vec<Match>,
    pub geometry: Geometry<f64>,
    pub wkb: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize feature: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink receiver disconnected")]
    Closed,
}

/// Insertion contract. Shared by all workers, so implementations must be
/// safe under concurrent calls.
pub trait FeatureSink: Send + Sync {
    fn insert(&self, feature: Feature) -> Result<(), SinkError>;
}

#[derive(Serialize)]
struct FeatureRecord<'a> {
    id: i64,
    #[serde(rename = "type")]
    kind: &'static str,
    tables: Vec<&'a str>,
    tags: &'a Tags,
    wkb: String,
}

/// Writes one JSON object per feature and line, WKB hex encoded
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<BufWriter<W>>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
        }
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write + Send> FeatureSink for JsonLinesSink<W> {
    fn insert(&self, feature: Feature) -> Result<(), SinkError> {
        let record = FeatureRecord {
            id: feature.id,
            kind: feature.kind.as_str(),
            tables: feature.matches.iter().map(|m| m.table.as_str()).collect(),
            tags: &feature.tags,
            wkb: hex::encode(&feature.wkb),
        };
        let line = serde_json::to_vec(&record)?;

        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Forwards features to a channel
pub struct ChannelSink {
    tx: Sender<Feature>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Feature>) -> Self {
        Self { tx }
    }
}

impl FeatureSink for ChannelSink {
    fn insert(&self, feature: Feature) -> Result<(), SinkError> {
        self.tx.send(feature).map_err(|_| SinkError::Closed)
    }
}
