//! WKB (Well-Known Binary) encoding
//!
//! ```text
//! byte order: 1 byte (little-endian = 1)
//! type:       4 bytes (point = 1, linestring = 2, polygon = 3, multi* = 4..6,
//!             collection = 7)
//! body:       type specific, counts as u32 and coordinates as f64 x/y pairs
//! ```

use geo::{Coord, Geometry, LineString, Polygon};

const LITTLE_ENDIAN: u8 = 1;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_COLLECTION: u32 = 7;

/// Encode any geometry as little-endian WKB
pub fn to_wkb(geom: &Geometry<f64>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    write_geometry(&mut buf, geom);
    buf
}

fn write_header(buf: &mut Vec<u8>, wkb_type: u32) {
    buf.push(LITTLE_ENDIAN);
    buf.extend_from_slice(&wkb_type.to_le_bytes());
}

fn write_count(buf: &mut Vec<u8>, count: usize) {
    buf.extend_from_slice(&(count as u32).to_le_bytes());
}

fn write_coord(buf: &mut Vec<u8>, coord: &Coord<f64>) {
    buf.extend_from_slice(&coord.x.to_le_bytes());
    buf.extend_from_slice(&coord.y.to_le_bytes());
}

fn write_ring(buf: &mut Vec<u8>, ring: &LineString<f64>) {
    write_count(buf, ring.0.len());
    for coord in &ring.0 {
        write_coord(buf, coord);
    }
}

fn write_line_string(buf: &mut Vec<u8>, line: &LineString<f64>) {
    write_header(buf, WKB_LINESTRING);
    write_ring(buf, line);
}

fn write_polygon(buf: &mut Vec<u8>, polygon: &Polygon<f64>) {
    write_header(buf, WKB_POLYGON);
    write_count(buf, 1 + polygon.interiors().len());
    write_ring(buf, polygon.exterior());
    for hole in polygon.interiors() {
        write_ring(buf, hole);
    }
}

fn write_geometry(buf: &mut Vec<u8>, geom: &Geometry<f64>) {
    match geom {
        Geometry::Point(point) => {
            write_header(buf, WKB_POINT);
            write_coord(buf, &point.0);
        }
        Geometry::Line(line) => {
            write_line_string(buf, &LineString::new(vec![line.start, line.end]));
        }
        Geometry::LineString(line) => write_line_string(buf, line),
        Geometry::Polygon(polygon) => write_polygon(buf, polygon),
        Geometry::MultiPoint(points) => {
            write_header(buf, WKB_MULTIPOINT);
            write_count(buf, points.0.len());
            for point in &points.0 {
                write_header(buf, WKB_POINT);
                write_coord(buf, &point.0);
            }
        }
        Geometry::MultiLineString(lines) => {
            write_header(buf, WKB_MULTILINESTRING);
            write_count(buf, lines.0.len());
            for line in &lines.0 {
                write_line_string(buf, line);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            write_header(buf, WKB_MULTIPOLYGON);
            write_count(buf, polygons.0.len());
            for polygon in &polygons.0 {
                write_polygon(buf, polygon);
            }
        }
        Geometry::GeometryCollection(collection) => {
            write_header(buf, WKB_COLLECTION);
            write_count(buf, collection.0.len());
            for member in &collection.0 {
                write_geometry(buf, member);
            }
        }
        Geometry::Rect(rect) => write_polygon(buf, &rect.to_polygon()),
        Geometry::Triangle(triangle) => write_polygon(buf, &triangle.to_polygon()),
    }
}
