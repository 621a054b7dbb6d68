//! Clipping of built geometries against a boundary
//!
//! The boundary is read from GeoJSON (a Polygon or MultiPolygon, bare or
//! wrapped in a Feature / FeatureCollection) and projected with the same
//! projection as the way nodes before use.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use butterfly_common::{Error, Result};
use geo::{
    BooleanOps, BoundingRect, Coord, Geometry, Intersects, LineString, MultiLineString,
    MultiPolygon, Polygon, Rect,
};
use serde::Deserialize;
use thiserror::Error as ThisError;

use crate::proj::Projection;

#[derive(Debug, ThisError)]
pub enum ClipError {
    #[error("cannot clip {0} geometries")]
    Unsupported(&'static str),

    #[error("clipping failed: {0}")]
    Failed(String),
}

/// Clipping contract: zero or more parts, each emitted as its own feature.
pub trait Clipper: Send + Sync {
    fn clip(&self, geom: &Geometry<f64>) -> std::result::Result<Vec<Geometry<f64>>, ClipError>;
}

/// Clips line strings and polygons to a (multi)polygon boundary
#[derive(Debug, Clone)]
pub struct BoundaryClipper {
    boundary: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
}

impl BoundaryClipper {
    pub fn new(boundary: MultiPolygon<f64>) -> Self {
        let bbox = boundary.bounding_rect();
        Self { boundary, bbox }
    }

    pub fn boundary(&self) -> &MultiPolygon<f64> {
        &self.boundary
    }

    pub fn from_path<P: AsRef<Path>>(path: P, projection: &dyn Projection) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_geojson_str(&text, projection)
    }

    pub fn from_geojson_str(text: &str, projection: &dyn Projection) -> Result<Self> {
        let object: GeoJsonObject = serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("invalid clip boundary: {e}")))?;

        let mut polygons = Vec::new();
        object.collect_polygons(projection, &mut polygons)?;
        if polygons.is_empty() {
            return Err(Error::InvalidInput(
                "clip boundary contains no polygons".to_string(),
            ));
        }
        Ok(Self::new(MultiPolygon::new(polygons)))
    }

    fn outside_bbox(&self, geom: &Geometry<f64>) -> bool {
        match (self.bbox, geom.bounding_rect()) {
            (Some(boundary), Some(rect)) => !boundary.intersects(&rect),
            _ => true,
        }
    }
}

impl Clipper for BoundaryClipper {
    fn clip(&self, geom: &Geometry<f64>) -> std::result::Result<Vec<Geometry<f64>>, ClipError> {
        let kind = match geom {
            Geometry::LineString(_) => "line string",
            Geometry::Polygon(_) => "polygon",
            Geometry::Point(_) => return Err(ClipError::Unsupported("point")),
            Geometry::Line(_) => return Err(ClipError::Unsupported("line")),
            Geometry::MultiPoint(_) => return Err(ClipError::Unsupported("multi point")),
            Geometry::MultiLineString(_) => return Err(ClipError::Unsupported("multi line string")),
            Geometry::MultiPolygon(_) => return Err(ClipError::Unsupported("multi polygon")),
            Geometry::GeometryCollection(_) => return Err(ClipError::Unsupported("collection")),
            Geometry::Rect(_) => return Err(ClipError::Unsupported("rect")),
            Geometry::Triangle(_) => return Err(ClipError::Unsupported("triangle")),
        };
        if self.outside_bbox(geom) {
            return Ok(Vec::new());
        }

        // boolean ops can panic on some degenerate rings
        let parts = panic::catch_unwind(AssertUnwindSafe(|| match geom {
            Geometry::LineString(line) => self
                .boundary
                .clip(&MultiLineString::new(vec![line.clone()]), false)
                .0
                .into_iter()
                .filter(|part| part.0.len() >= 2)
                .map(Geometry::LineString)
                .collect::<Vec<_>>(),
            Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon.clone()])
                .intersection(&self.boundary)
                .0
                .into_iter()
                .map(Geometry::Polygon)
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        }))
        .map_err(|_| ClipError::Failed(format!("boolean operation on {kind} panicked")))?;

        Ok(parts)
    }
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonObject {
    Feature {
        geometry: Option<Box<GeoJsonObject>>,
    },
    FeatureCollection {
        features: Vec<GeoJsonObject>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl GeoJsonObject {
    fn collect_polygons(
        self,
        projection: &dyn Projection,
        out: &mut Vec<Polygon<f64>>,
    ) -> Result<()> {
        match self {
            GeoJsonObject::Feature { geometry } => {
                if let Some(geometry) = geometry {
                    geometry.collect_polygons(projection, out)?;
                }
            }
            GeoJsonObject::FeatureCollection { features } => {
                for feature in features {
                    feature.collect_polygons(projection, out)?;
                }
            }
            GeoJsonObject::Polygon { coordinates } => {
                out.push(to_polygon(coordinates, projection)?);
            }
            GeoJsonObject::MultiPolygon { coordinates } => {
                for rings in coordinates {
                    out.push(to_polygon(rings, projection)?);
                }
            }
        }
        Ok(())
    }
}

fn to_polygon(rings: Vec<Vec<Position>>, projection: &dyn Projection) -> Result<Polygon<f64>> {
    let mut rings = rings
        .into_iter()
        .map(|ring| to_ring(ring, projection))
        .collect::<Result<Vec<_>>>()?;
    if rings.is_empty() {
        return Err(Error::InvalidInput("polygon without rings".to_string()));
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn to_ring(positions: Vec<Position>, projection: &dyn Projection) -> Result<LineString<f64>> {
    if positions.len() < 4 {
        return Err(Error::InvalidInput(format!(
            "polygon ring needs at least 4 positions, got {}",
            positions.len()
        )));
    }
    positions
        .into_iter()
        .map(|pos| match pos.as_slice() {
            [lon, lat, ..] => {
                let (x, y) = projection.project(*lon, *lat);
                Ok(Coord { x, y })
            }
            _ => Err(Error::InvalidInput(
                "position needs at least 2 values".to_string(),
            )),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}
