//! Geometry construction from resolved way nodes
//!
//! A [`GeometryEngine`] is owned by a single worker thread. It is created
//! when the worker starts and released when the worker exits.

pub mod wkb;

use std::cell::Cell;
use std::marker::PhantomData;

use butterfly_common::Node;
use geo::{Area, Coord, Geometry, LineString, Polygon};
use log::debug;
use thiserror::Error;

/// How much a geometry failure matters.
///
/// Failures at or below [`Severity::Degenerate`] are dropped silently; they are
/// normal for real-world data (a way with one node, a closed sliver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Degenerate = 0,
    Invalid = 1,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct GeometryError {
    severity: Severity,
    message: String,
}

impl GeometryError {
    fn degenerate(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Degenerate,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Invalid,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether the failure should be reported
    pub fn is_actionable(&self) -> bool {
        self.severity > Severity::Degenerate
    }
}

/// Per-worker geometry builder. Not `Send`: each worker creates its own.
pub struct GeometryEngine {
    built: Cell<u64>,
    _not_send: PhantomData<*const ()>,
}

impl Default for GeometryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryEngine {
    pub fn new() -> Self {
        Self {
            built: Cell::new(0),
            _not_send: PhantomData,
        }
    }

    /// Number of geometries successfully built by this engine
    pub fn built(&self) -> u64 {
        self.built.get()
    }

    /// Open line through the nodes in order.
    ///
    /// Consecutive repeated points are collapsed; fewer than two distinct
    /// points is degenerate.
    pub fn line_string(&self, nodes: &[Node]) -> Result<Geometry<f64>, GeometryError> {
        let coords = coords_of(nodes)?;
        if coords.len() < 2 {
            return Err(GeometryError::degenerate(format!(
                "line string needs at least 2 distinct points, got {}",
                coords.len()
            )));
        }
        self.bump();
        Ok(Geometry::LineString(LineString::new(coords)))
    }

    /// Polygon whose exterior ring is the node sequence.
    ///
    /// The ring must be closed on coordinates. Rings with fewer than four
    /// points or zero area are degenerate.
    pub fn polygon(&self, nodes: &[Node]) -> Result<Geometry<f64>, GeometryError> {
        let coords = coords_of(nodes)?;
        if coords.len() < 4 {
            return Err(GeometryError::degenerate(format!(
                "polygon ring needs at least 4 points, got {}",
                coords.len()
            )));
        }
        if coords.first() != coords.last() {
            return Err(GeometryError::invalid("polygon ring is not closed"));
        }

        let polygon = Polygon::new(LineString::new(coords), Vec::new());
        if polygon.unsigned_area() == 0.0 {
            return Err(GeometryError::degenerate("polygon has zero area"));
        }
        self.bump();
        Ok(Geometry::Polygon(polygon))
    }

    pub fn as_wkb(&self, geom: &Geometry<f64>) -> Vec<u8> {
        wkb::to_wkb(geom)
    }

    fn bump(&self) {
        self.built.set(self.built.get() + 1);
    }
}

impl Drop for GeometryEngine {
    fn drop(&mut self) {
        debug!("Geometry engine released after {} geometries", self.built.get());
    }
}

fn coords_of(nodes: &[Node]) -> Result<Vec<Coord<f64>>, GeometryError> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !node.lon.is_finite() || !node.lat.is_finite() {
            return Err(GeometryError::invalid(format!(
                "node {} has non-finite coordinates",
                node.id
            )));
        }
        let coord = Coord {
            x: node.lon,
            y: node.lat,
        };
        if coords.last() != Some(&coord) {
            coords.push(coord);
        }
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(points: &[(f64, f64)]) -> Vec<Node> {
        points
            .iter()
            .enumerate()
            .map(|(i, (x, y))| Node::new(i as i64 + 1, *x, *y))
            .collect()
    }

    #[test]
    fn test_line_string() {
        let engine = GeometryEngine::new();
        let geom = engine
            .line_string(&nodes(&[(0.0, 0.0), (1.0, 1.0), (1.0, 1.0), (2.0, 0.0)]))
            .unwrap();

        match geom {
            Geometry::LineString(line) => assert_eq!(line.0.len(), 3),
            other => panic!("unexpected geometry {other:?}"),
        }
        assert_eq!(engine.built(), 1);
    }

    #[test]
    fn test_single_point_line_is_degenerate() {
        let engine = GeometryEngine::new();
        let err = engine
            .line_string(&nodes(&[(1.0, 1.0), (1.0, 1.0)]))
            .unwrap_err();
        assert_eq!(err.severity(), Severity::Degenerate);
        assert!(!err.is_actionable());

        let err = engine.line_string(&[]).unwrap_err();
        assert!(!err.is_actionable());
        assert_eq!(engine.built(), 0);
    }

    #[test]
    fn test_polygon() {
        let engine = GeometryEngine::new();
        let geom = engine
            .polygon(&nodes(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]))
            .unwrap();
        assert!(matches!(geom, Geometry::Polygon(_)));
    }

    #[test]
    fn test_zero_area_polygon_is_degenerate() {
        let engine = GeometryEngine::new();
        let err = engine
            .polygon(&nodes(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]))
            .unwrap_err();
        assert_eq!(err.severity(), Severity::Degenerate);
    }

    #[test]
    fn test_open_ring_is_invalid() {
        let engine = GeometryEngine::new();
        let err = engine
            .polygon(&nodes(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 1.0)]))
            .unwrap_err();
        assert!(err.is_actionable());
    }

    #[test]
    fn test_non_finite_is_invalid() {
        let engine = GeometryEngine::new();
        let err = engine
            .line_string(&nodes(&[(0.0, 0.0), (f64::NAN, 1.0)]))
            .unwrap_err();
        assert_eq!(err.severity(), Severity::Invalid);
    }

    #[test]
    fn test_as_wkb() {
        let engine = GeometryEngine::new();
        let geom = engine
            .line_string(&nodes(&[(0.0, 0.0), (1.0, 1.0)]))
            .unwrap();
        let wkb = engine.as_wkb(&geom);
        assert_eq!(wkb[0], 1);
        assert_eq!(wkb.len(), 41);
    }
}
