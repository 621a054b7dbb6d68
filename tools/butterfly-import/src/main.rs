//! # Butterfly-import CLI
//!
//! Two passes over an OpenStreetMap extract:
//!   butterfly-import read belgium.osm.pbf          # fill the node and way caches
//!   butterfly-import write -m mapping.yml -o out.jsonl

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use butterfly_cache::OsmCache;
use butterfly_common::EntityKind;
use butterfly_import::{
    feed_ways, read_pbf, way_channel, BoundaryClipper, Clipper, ImportConfig, JsonLinesSink,
    Mapping, Projection, ProjectionKind, TableType, WayWriter, WriterContext,
};
use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter};

mod cli;

#[derive(Parser)]
#[command(name = "butterfly-import")]
#[command(about = "Cache OpenStreetMap ways and transform them into classified geometries")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory (overrides the configuration)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a PBF file into the node and way caches
    Read {
        /// Input PBF file
        #[arg(value_name = "INPUT_FILE")]
        input: PathBuf,

        /// Elements per cache write batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Remove existing caches before reading
        #[arg(long)]
        overwrite: bool,
    },
    /// Transform cached ways into features written as JSON lines
    Write {
        /// Tag mapping file
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// GeoJSON clip boundary
        #[arg(long)]
        clip: Option<PathBuf>,

        #[arg(long, value_enum)]
        projection: Option<ProjectionKind>,

        /// Worker threads, 0 for one per CPU
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Output file, or "-" for stdout
        #[arg(short, long, default_value = "-")]
        output: String,

        /// Record written ways so a later run skips them
        #[arg(long)]
        mark_inserted: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stderr);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ImportConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ImportConfig::default(),
    };
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }

    match cli.command {
        Command::Read {
            input,
            batch_size,
            overwrite,
        } => {
            if let Some(size) = batch_size {
                config.batch_size = size;
            }
            config.validate()?;
            run_read(&config, &input, overwrite)
        }
        Command::Write {
            mapping,
            clip,
            projection,
            workers,
            output,
            mark_inserted,
        } => {
            if mapping.is_some() {
                config.mapping = mapping;
            }
            if clip.is_some() {
                config.clip = clip;
            }
            if let Some(projection) = projection {
                config.projection = projection;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            config.mark_inserted |= mark_inserted;
            config.validate()?;
            run_write(&config, &output)
        }
    }
}

fn run_read(config: &ImportConfig, input: &Path, overwrite: bool) -> Result<()> {
    if overwrite {
        OsmCache::remove(&config.cache_dir)
            .with_context(|| format!("Failed to remove caches in {}", config.cache_dir.display()))?;
    }
    let cache = OsmCache::open(&config.cache_dir, &config.caches)
        .with_context(|| format!("Failed to open caches in {}", config.cache_dir.display()))?;

    let progress = cli::ProgressManager::new(&format!("📖 Reading {}", input.display()));
    let summary = read_pbf(input, &cache, config.batch_size, &progress)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    progress.finish("✅ Read completed!");
    cache.close();

    eprintln!(
        "📦 Cached {} nodes and {} ways ({} relations ignored)",
        summary.nodes, summary.ways, summary.relations
    );
    Ok(())
}

fn run_write(config: &ImportConfig, output: &str) -> Result<()> {
    let mapping_path = config
        .mapping
        .as_ref()
        .context("No mapping file configured, use --mapping")?;
    let mapping = Mapping::from_path(mapping_path)
        .with_context(|| format!("Failed to load mapping {}", mapping_path.display()))?;
    let line_strings = mapping.matcher(TableType::LineString);
    let polygons = mapping.matcher(TableType::Polygon);
    if line_strings.is_empty() && polygons.is_empty() {
        warn!("Mapping {} has no rules, nothing will be written", mapping_path.display());
    }

    let projection: Arc<dyn Projection> = Arc::from(config.projection.projection());
    let clipper: Option<Arc<dyn Clipper>> = match &config.clip {
        Some(path) => {
            let clipper: Arc<dyn Clipper> = Arc::new(
                BoundaryClipper::from_path(path, projection.as_ref())
                    .with_context(|| format!("Failed to load clip boundary {}", path.display()))?,
            );
            Some(clipper)
        }
        None => None,
    };

    let writer: Box<dyn Write + Send> = if output == "-" {
        Box::new(std::io::stdout())
    } else {
        Box::new(File::create(output).with_context(|| format!("Failed to create {output}"))?)
    };
    let sink = Arc::new(JsonLinesSink::new(writer));

    let cache = OsmCache::open(&config.cache_dir, &config.caches)
        .with_context(|| format!("Failed to open caches in {}", config.cache_dir.display()))?;
    let (coords, ways, inserted) = cache.into_parts();

    let workers = config.worker_count();
    info!(
        "Writing with {workers} workers, SRID {}",
        config.projection.srid()
    );
    let progress = Arc::new(cli::ProgressManager::new("🦋 Writing ways"));
    let (tx, rx) = way_channel(config.channel_capacity);
    let pool = WayWriter::spawn(
        WriterContext {
            inserted: Arc::new(inserted),
            resolver: Arc::new(coords),
            projection,
            line_strings: Arc::new(line_strings),
            polygons: Arc::new(polygons),
            clipper,
            sink: sink.clone(),
            progress: progress.clone(),
            mark_inserted: config.mark_inserted,
        },
        rx,
        workers,
    )?;

    let fed = feed_ways(&ways, &tx);
    drop(tx);
    let summary = pool.wait();
    sink.flush().context("Failed to flush output")?;

    let fed = fed.context("Failed to stream cached ways")?;
    let summary = summary.context("Way writers aborted")?;
    progress.finish("✅ Write completed!");

    eprintln!(
        "🗺️  {} features from {} ways ({} fed)",
        summary.features,
        progress.processed(EntityKind::Way),
        fed
    );
    eprintln!(
        "   skipped {}, unresolved {}, unmatched {}, degenerate {}, invalid {}, outside clip {}, clip failed {}, sink failed {}",
        summary.skipped,
        summary.unresolved,
        summary.unmatched,
        summary.geometry_dropped,
        summary.geometry_failed,
        summary.clipped_out,
        summary.clip_failed,
        summary.sink_failed
    );
    Ok(())
}
