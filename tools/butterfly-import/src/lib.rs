//! Butterfly-import library
//!
//! Reads OpenStreetMap ways into on-disk caches and turns them into
//! classified line string and polygon features with a pool of worker
//! threads.

pub mod clip;
pub mod config;
pub mod feature;
pub mod geom;
pub mod ingest;
pub mod mapping;
pub mod pipeline;
pub mod proj;
pub mod stats;

pub use clip::{BoundaryClipper, ClipError, Clipper};
pub use config::ImportConfig;
pub use feature::{ChannelSink, Feature, FeatureSink, JsonLinesSink, SinkError};
pub use geom::{GeometryEngine, GeometryError, Severity};
pub use ingest::{feed_ways, read_pbf, ReadSummary, BATCH_SIZE};
pub use mapping::{Mapping, Match, TableMatcher, TableType, TagMatcher};
pub use pipeline::{way_channel, WayWriter, WriterContext, WriterSummary};
pub use proj::{Projection, ProjectionKind, WebMercator, Wgs84};
pub use stats::{Progress, Statistics};
