//! Coordinate projections applied to resolved nodes

use butterfly_common::Node;
use serde::Deserialize;

const EARTH_RADIUS: f64 = 6378137.0;
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Projection contract: rewrites node coordinates in place, cannot fail.
pub trait Projection: Send + Sync {
    fn project_in_place(&self, nodes: &mut [Node]);

    /// Project a single lon/lat pair
    fn project(&self, lon: f64, lat: f64) -> (f64, f64);
}

/// Spherical Web Mercator (EPSG:3857)
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl Projection for WebMercator {
    fn project_in_place(&self, nodes: &mut [Node]) {
        for node in nodes {
            let (x, y) = self.project(node.lon, node.lat);
            node.lon = x;
            node.lat = y;
        }
    }

    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let x = lon.to_radians() * EARTH_RADIUS;
        let y = ((std::f64::consts::PI / 4.0) + (lat.to_radians() / 2.0)).tan().ln() * EARTH_RADIUS;
        (x, y)
    }
}

/// Keeps WGS84 degrees (EPSG:4326)
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84;

impl Projection for Wgs84 {
    fn project_in_place(&self, _nodes: &mut [Node]) {}

    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon, lat)
    }
}

/// Projection selected in the import configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    #[default]
    #[value(name = "webmercator")]
    WebMercator,
    Wgs84,
}

impl ProjectionKind {
    pub fn projection(self) -> Box<dyn Projection> {
        match self {
            ProjectionKind::WebMercator => Box::new(WebMercator),
            ProjectionKind::Wgs84 => Box::new(Wgs84),
        }
    }

    pub fn srid(self) -> u32 {
        match self {
            ProjectionKind::WebMercator => 3857,
            ProjectionKind::Wgs84 => 4326,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercator_origin_and_bounds() {
        let (x, y) = WebMercator.project(0.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);

        let (x, _) = WebMercator.project(180.0, 0.0);
        assert!((x - 20_037_508.342_789_244).abs() < 1e-6);

        // clamped at the poles
        let (_, y_pole) = WebMercator.project(0.0, 90.0);
        let (_, y_max) = WebMercator.project(0.0, MAX_MERCATOR_LAT);
        assert_eq!(y_pole, y_max);
        assert!(y_pole.is_finite());
    }

    #[test]
    fn test_project_in_place_keeps_ids_and_order() {
        let mut nodes = vec![Node::new(1, 4.35, 50.85), Node::new(2, -0.12, 51.5)];
        WebMercator.project_in_place(&mut nodes);

        assert_eq!(nodes[0].id, 1);
        assert_eq!(nodes[1].id, 2);
        assert!((nodes[0].lon - 484_239.785).abs() < 1e-2);
        assert!((nodes[0].lat - 6_594_803.227).abs() < 1e-2);
        assert!(nodes[1].lon < 0.0);
    }

    #[test]
    fn test_wgs84_is_identity() {
        let mut nodes = vec![Node::new(1, 4.35, 50.85)];
        Wgs84.project_in_place(&mut nodes);
        assert_eq!(nodes[0], Node::new(1, 4.35, 50.85));
    }
}
