//! Cached ways streamed through the pool into a JSON lines file

use std::fs::File;
use std::sync::Arc;
use std::thread;

use butterfly_cache::{OsmCache, OsmCacheOptions};
use butterfly_common::{EntityKind, Node, Tags, Way};
use butterfly_import::{
    feed_ways, way_channel, JsonLinesSink, Mapping, ProjectionKind, Statistics, TableType,
    WayWriter, WriterContext,
};
use tempfile::TempDir;

const MAPPING: &str = r#"
tables:
  roads:
    type: linestring
    mapping:
      highway: [__any__]
  buildings:
    type: polygon
    mapping:
      building: [__any__]
"#;

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_cache_to_json_lines() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let output = dir.path().join("out.jsonl");

    let cache = OsmCache::open(&cache_dir, &OsmCacheOptions::default()).unwrap();
    cache
        .coords
        .put_batch(&[
            Node::new(1, 4.35, 50.84),
            Node::new(2, 4.36, 50.84),
            Node::new(3, 4.36, 50.85),
            Node::new(4, 4.35, 50.85),
        ])
        .unwrap();
    cache
        .ways
        .put_batch(&[
            Way::new(100, vec![1, 2, 3], tags(&[("highway", "residential")])),
            Way::new(200, vec![1, 2, 3, 4, 1], tags(&[("building", "yes")])),
            Way::new(300, vec![1, 42], tags(&[("highway", "service")])),
        ])
        .unwrap();

    let mapping = Mapping::from_yaml_str(MAPPING).unwrap();
    let (coords, ways, inserted) = cache.into_parts();
    let sink = Arc::new(JsonLinesSink::new(File::create(&output).unwrap()));
    let stats = Arc::new(Statistics::new());

    let (tx, rx) = way_channel(2);
    let pool = WayWriter::spawn(
        WriterContext {
            inserted: Arc::new(inserted),
            resolver: Arc::new(coords),
            projection: Arc::from(ProjectionKind::WebMercator.projection()),
            line_strings: Arc::new(mapping.matcher(TableType::LineString)),
            polygons: Arc::new(mapping.matcher(TableType::Polygon)),
            clipper: None,
            sink: sink.clone(),
            progress: stats.clone(),
            mark_inserted: true,
        },
        rx,
        3,
    )
    .unwrap();

    let feeder = thread::spawn(move || {
        let sent = feed_ways(&ways, &tx).unwrap();
        (sent, ways)
    });
    let (sent, ways) = feeder.join().unwrap();
    let summary = pool.wait().unwrap();
    sink.flush().unwrap();

    assert_eq!(sent, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.features, 2);
    assert_eq!(summary.unresolved, 1);
    assert_eq!(stats.processed(EntityKind::Way), 3);
    drop(ways);

    let text = std::fs::read_to_string(&output).unwrap();
    let mut rows: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    rows.sort_by_key(|row| row["id"].as_i64().unwrap());

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], 100);
    assert_eq!(rows[0]["type"], "linestring");
    assert_eq!(rows[0]["tables"][0], "roads");
    assert_eq!(rows[1]["id"], 200);
    assert_eq!(rows[1]["type"], "polygon");
    assert_eq!(rows[1]["tags"]["building"], "yes");

    // little-endian polygon header
    let wkb = hex::decode(rows[1]["wkb"].as_str().unwrap()).unwrap();
    assert_eq!(&wkb[..5], &[1, 3, 0, 0, 0]);
}
