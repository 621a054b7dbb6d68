//! Cache population from PBF and streaming of cached ways into the pool

use std::path::Path;

use butterfly_cache::{OsmCache, WaysCache};
use butterfly_common::{EntityKind, Error, Node, Result, Tags, Way};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use osmpbf::{Element, ElementReader};

use crate::stats::Progress;

/// Default number of elements per cache write batch
pub const BATCH_SIZE: usize = 5000;

/// Element counts written by [`read_pbf`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub nodes: u64,
    pub ways: u64,
    /// Relations are not cached; counted so the totals add up
    pub relations: u64,
}

struct Batches<'a> {
    cache: &'a OsmCache,
    batch_size: usize,
    nodes: Vec<Node>,
    ways: Vec<Way>,
}

impl Batches<'_> {
    fn push_node(&mut self, node: Node) -> Result<()> {
        self.nodes.push(node);
        if self.nodes.len() >= self.batch_size {
            self.flush_nodes()?;
        }
        Ok(())
    }

    fn push_way(&mut self, way: Way) -> Result<()> {
        self.ways.push(way);
        if self.ways.len() >= self.batch_size {
            self.flush_ways()?;
        }
        Ok(())
    }

    fn flush_nodes(&mut self) -> Result<()> {
        if !self.nodes.is_empty() {
            self.cache.coords.put_batch(&self.nodes)?;
            self.nodes.clear();
        }
        Ok(())
    }

    fn flush_ways(&mut self) -> Result<()> {
        if !self.ways.is_empty() {
            self.cache.ways.put_batch(&self.ways)?;
            self.ways.clear();
        }
        Ok(())
    }
}

/// Read an OSM PBF file into the coords and ways caches.
///
/// Nodes and ways are written through batch puts of `batch_size` elements.
/// The first failing write stops the import and is returned.
pub fn read_pbf<P: AsRef<Path>>(
    path: P,
    cache: &OsmCache,
    batch_size: usize,
    progress: &dyn Progress,
) -> Result<ReadSummary> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file not found: {}", path.display()),
        )));
    }

    let reader = ElementReader::from_path(path)
        .map_err(|e| Error::InvalidInput(format!("Failed to open PBF file: {e}")))?;

    let mut batches = Batches {
        cache,
        batch_size: batch_size.max(1),
        nodes: Vec::with_capacity(batch_size),
        ways: Vec::with_capacity(batch_size),
    };
    let mut summary = ReadSummary::default();
    let mut failure: Option<Error> = None;

    reader
        .for_each(|element| {
            if failure.is_some() {
                return;
            }
            let written = match element {
                Element::Node(node) => {
                    summary.nodes += 1;
                    progress.add_processed(EntityKind::Node, 1);
                    batches.push_node(Node::new(node.id(), node.lon(), node.lat()))
                }
                Element::DenseNode(node) => {
                    summary.nodes += 1;
                    progress.add_processed(EntityKind::Node, 1);
                    batches.push_node(Node::new(node.id(), node.lon(), node.lat()))
                }
                Element::Way(way) => {
                    summary.ways += 1;
                    progress.add_processed(EntityKind::Way, 1);
                    let tags: Tags = way
                        .tags()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    batches.push_way(Way::new(way.id(), way.refs().collect(), tags))
                }
                Element::Relation(_) => {
                    summary.relations += 1;
                    Ok(())
                }
            };
            if let Err(e) = written {
                failure = Some(e);
            }
        })
        .map_err(|e| Error::InvalidInput(format!("Failed to read PBF elements: {e}")))?;

    if let Some(e) = failure {
        return Err(e);
    }
    batches.flush_nodes()?;
    batches.flush_ways()?;

    info!(
        "Cached {} nodes and {} ways from {}",
        summary.nodes,
        summary.ways,
        path.display()
    );
    Ok(summary)
}

/// Stream every cached way, id restored, into the pool's channel.
///
/// Corrupt records are logged and skipped. Returns the number of ways sent;
/// stops early without error once all receivers are gone.
pub fn feed_ways(ways: &WaysCache, tx: &Sender<Way>) -> Result<u64> {
    let mut sent = 0;
    for item in ways.iter() {
        let raw = match item {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping cached way: {e}");
                continue;
            }
        };
        let way = match ways.decode(&raw) {
            Ok(way) => way,
            Err(e) => {
                warn!("Skipping way {}: {e}", raw.id);
                continue;
            }
        };
        if tx.send(way).is_err() {
            debug!("Way writers gone, stopping feeder after {sent} ways");
            break;
        }
        sent += 1;
    }
    Ok(sent)
}
