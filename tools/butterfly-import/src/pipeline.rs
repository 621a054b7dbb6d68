//! Way transform worker pool
//!
//! Each worker owns a [`GeometryEngine`] and runs the whole per-way pipeline
//! before taking the next way off the shared bounded channel:
//!
//! ```text
//! received -> dedup check -> resolve -> project -> match -> build -> (clip) -> emit
//! ```
//!
//! Any gate may drop the way. Per-way faults are counted and never stop the
//! pool; only a store that can no longer serve reads or writes aborts it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use butterfly_cache::{CoordinateResolver, ExistenceIndex};
use butterfly_common::{EntityKind, Error, Result, Way};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, warn};

use crate::clip::Clipper;
use crate::feature::{Feature, FeatureSink};
use crate::geom::GeometryEngine;
use crate::mapping::{Match, TableType, TagMatcher};
use crate::proj::Projection;
use crate::stats::Progress;

/// Bounded way queue between feeders and the pool
pub fn way_channel(capacity: usize) -> (Sender<Way>, Receiver<Way>) {
    crossbeam_channel::bounded(capacity)
}

/// Everything a worker needs, shared read-only by all workers
pub struct WriterContext {
    pub inserted: Arc<ExistenceIndex>,
    pub resolver: Arc<dyn CoordinateResolver>,
    pub projection: Arc<dyn Projection>,
    pub line_strings: Arc<dyn TagMatcher>,
    pub polygons: Arc<dyn TagMatcher>,
    pub clipper: Option<Arc<dyn Clipper>>,
    pub sink: Arc<dyn FeatureSink>,
    pub progress: Arc<dyn Progress>,
    /// Mark ways that emitted at least one feature in `inserted`
    pub mark_inserted: bool,
}

/// Per-run outcome counts, summed over all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub processed: u64,
    /// Already present in the existence index
    pub skipped: u64,
    /// At least one node missing or unreadable
    pub unresolved: u64,
    /// Matched neither rule set
    pub unmatched: u64,
    pub features: u64,
    /// Degenerate geometries, dropped without logging
    pub geometry_dropped: u64,
    pub geometry_failed: u64,
    /// Geometries entirely outside the clip boundary
    pub clipped_out: u64,
    pub clip_failed: u64,
    pub sink_failed: u64,
}

impl WriterSummary {
    pub fn merge(&mut self, other: &WriterSummary) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.unresolved += other.unresolved;
        self.unmatched += other.unmatched;
        self.features += other.features;
        self.geometry_dropped += other.geometry_dropped;
        self.geometry_failed += other.geometry_failed;
        self.clipped_out += other.clipped_out;
        self.clip_failed += other.clip_failed;
        self.sink_failed += other.sink_failed;
    }
}

/// Handle to a running pool
pub struct WayWriter {
    handles: Vec<JoinHandle<Result<WriterSummary>>>,
    abort: Arc<AtomicBool>,
}

impl WayWriter {
    /// Start `workers` threads draining `rx`.
    ///
    /// The pool finishes once every sender is dropped and the channel is
    /// drained, or as soon as one worker hits a fatal store error.
    pub fn spawn(ctx: WriterContext, rx: Receiver<Way>, workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let ctx = Arc::new(ctx);
        let abort = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let ctx = Arc::clone(&ctx);
            let abort = Arc::clone(&abort);
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("way-writer-{i}"))
                .spawn(move || run_worker(&ctx, rx, &abort))?;
            handles.push(handle);
        }
        debug!("Started {workers} way writers");

        Ok(Self { handles, abort })
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Block until all workers are done.
    ///
    /// Returns the merged summary, or the first fatal error a worker hit.
    pub fn wait(self) -> Result<WriterSummary> {
        let mut summary = WriterSummary::default();
        let mut failure: Option<Error> = None;

        for handle in self.handles {
            match handle.join() {
                Ok(Ok(worker)) => summary.merge(&worker),
                Ok(Err(e)) => {
                    error!("Way writer aborted: {e}");
                    failure.get_or_insert(e);
                }
                Err(_) => {
                    error!("Way writer panicked");
                    failure.get_or_insert(Error::WorkerPanicked);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

/// Raises the abort flag when a worker unwinds
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

fn run_worker(ctx: &WriterContext, rx: Receiver<Way>, abort: &AtomicBool) -> Result<WriterSummary> {
    let _guard = AbortOnPanic(abort);
    let engine = GeometryEngine::new();
    let mut summary = WriterSummary::default();

    for way in rx.iter() {
        if abort.load(Ordering::Relaxed) {
            break;
        }
        ctx.progress.add_processed(EntityKind::Way, 1);
        summary.processed += 1;

        if let Err(e) = process_way(ctx, &engine, way, &mut summary) {
            abort.store(true, Ordering::Relaxed);
            return Err(e);
        }
    }
    // rx drops here, releasing feeders blocked on a full channel

    Ok(summary)
}

fn process_way(
    ctx: &WriterContext,
    engine: &GeometryEngine,
    mut way: Way,
    summary: &mut WriterSummary,
) -> Result<()> {
    match ctx.inserted.contains(way.id) {
        Ok(true) => {
            summary.skipped += 1;
            return Ok(());
        }
        Ok(false) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("Way {}: existence check failed: {e}", way.id);
            summary.unresolved += 1;
            return Ok(());
        }
    }

    if let Err(e) = ctx.resolver.fill_way(&mut way) {
        if e.is_fatal() {
            return Err(e);
        }
        debug!("Way {} unresolved: {e}", way.id);
        summary.unresolved += 1;
        return Ok(());
    }

    ctx.projection.project_in_place(&mut way.nodes);

    let line_matches = ctx.line_strings.matches(&way.tags);
    let polygon_matches = if way.is_closed() {
        ctx.polygons.matches(&way.tags)
    } else {
        Vec::new()
    };
    if line_matches.is_empty() && polygon_matches.is_empty() {
        summary.unmatched += 1;
        return Ok(());
    }

    let id = way.id;
    let mut emitted = 0;
    if !line_matches.is_empty() {
        emitted += build_and_insert(
            ctx,
            engine,
            way.clone(),
            TableType::LineString,
            line_matches,
            summary,
        );
    }
    if !polygon_matches.is_empty() {
        emitted += build_and_insert(ctx, engine, way, TableType::Polygon, polygon_matches, summary);
    }

    if emitted > 0 && ctx.mark_inserted {
        ctx.inserted.mark(id)?;
    }
    Ok(())
}

/// Build one candidate from its own copy of the way and hand every
/// resulting part to the sink. Returns the number of features inserted.
fn build_and_insert(
    ctx: &WriterContext,
    engine: &GeometryEngine,
    way: Way,
    kind: TableType,
    matches: Vec<Match>,
    summary: &mut WriterSummary,
) -> u64 {
    let built = match kind {
        TableType::LineString => engine.line_string(&way.nodes),
        TableType::Polygon => engine.polygon(&way.nodes),
    };
    let geometry = match built {
        Ok(geometry) => geometry,
        Err(e) if !e.is_actionable() => {
            summary.geometry_dropped += 1;
            return 0;
        }
        Err(e) => {
            warn!("Way {}: {} geometry failed: {e}", way.id, kind.as_str());
            summary.geometry_failed += 1;
            return 0;
        }
    };

    let parts = match &ctx.clipper {
        None => vec![geometry],
        Some(clipper) => match clipper.clip(&geometry) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Way {}: {e}", way.id);
                summary.clip_failed += 1;
                return 0;
            }
        },
    };
    if parts.is_empty() {
        summary.clipped_out += 1;
        return 0;
    }

    let mut inserted = 0;
    for part in parts {
        let feature = Feature {
            id: way.id,
            kind,
            tags: way.tags.clone(),
            matches: matches.clone(),
            wkb: engine.as_wkb(&part),
            geometry: part,
        };
        match ctx.sink.insert(feature) {
            Ok(()) => {
                summary.features += 1;
                inserted += 1;
            }
            Err(e) => {
                warn!("Way {}: insert failed: {e}", way.id);
                summary.sink_failed += 1;
            }
        }
    }
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_merge() {
        let mut total = WriterSummary {
            processed: 3,
            features: 2,
            ..Default::default()
        };
        total.merge(&WriterSummary {
            processed: 4,
            skipped: 1,
            geometry_dropped: 2,
            ..Default::default()
        });

        assert_eq!(total.processed, 7);
        assert_eq!(total.features, 2);
        assert_eq!(total.skipped, 1);
        assert_eq!(total.geometry_dropped, 2);
    }

    #[test]
    fn test_abort_on_panic_guard() {
        let flag = Arc::new(AtomicBool::new(false));
        let inner = Arc::clone(&flag);
        let result = thread::spawn(move || {
            let _guard = AbortOnPanic(&inner);
            panic!("boom");
        })
        .join();

        assert!(result.is_err());
        assert!(flag.load(Ordering::Relaxed));

        let flag = AtomicBool::new(false);
        drop(AbortOnPanic(&flag));
        assert!(!flag.load(Ordering::Relaxed));
    }
}
