use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a region geometry.
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    /// A polygon needs at least three distinct vertices
    #[error("polygon needs at least 3 distinct points, got {0}")]
    TooFewPoints(usize),

    /// Longitude outside [-180, 180] or latitude outside [-90, 90]
    #[error("coordinate out of range: [{lon}, {lat}]")]
    OutOfRange { lon: f64, lat: f64 },

    /// Client-supplied coordinate JSON could not be parsed
    #[error("malformed coordinates: {0}")]
    Malformed(String),
}

/// The region a satellite or climate query is scoped to: a closed polygon
/// (implicitly closed; the first vertex is not repeated) or a single point.
///
/// Coordinates are `[longitude, latitude]` pairs, matching the order the
/// imagery service expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionGeometry {
    Polygon(Vec<[f64; 2]>),
    Point([f64; 2]),
}

fn check_range(lon: f64, lat: f64) -> Result<(), GeometryError> {
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(GeometryError::OutOfRange { lon, lat });
    }
    Ok(())
}

impl RegionGeometry {
    /// Build a closed polygon from ordered `[lon, lat]` pairs.
    ///
    /// An explicitly closed ring (last vertex equal to the first) is accepted
    /// and normalized to the implicit form.
    pub fn polygon(points: Vec<[f64; 2]>) -> Result<Self, GeometryError> {
        let mut points = points;
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        let mut distinct: Vec<[f64; 2]> = Vec::with_capacity(points.len());
        for p in &points {
            if !distinct.contains(p) {
                distinct.push(*p);
            }
        }
        if distinct.len() < 3 {
            return Err(GeometryError::TooFewPoints(distinct.len()));
        }
        for p in &points {
            check_range(p[0], p[1])?;
        }
        Ok(RegionGeometry::Polygon(points))
    }

    pub fn point(lon: f64, lat: f64) -> Result<Self, GeometryError> {
        check_range(lon, lat)?;
        Ok(RegionGeometry::Point([lon, lat]))
    }

    /// Parse a client-supplied JSON array of `[lon, lat]` pairs, as sent in
    /// the `coordinates` query parameter, and validate it as a polygon.
    pub fn polygon_from_json(raw: &str) -> Result<Self, GeometryError> {
        let points: Vec<[f64; 2]> =
            serde_json::from_str(raw).map_err(|e| GeometryError::Malformed(e.to_string()))?;
        Self::polygon(points)
    }

    /// The polygon ring (with the ring explicitly closed) or the single
    /// point, in the nesting the imagery service's geometry constructors use.
    pub fn coordinates_json(&self) -> serde_json::Value {
        match self {
            RegionGeometry::Polygon(points) => {
                let mut ring = points.clone();
                if let Some(first) = ring.first().copied() {
                    ring.push(first);
                }
                serde_json::json!([ring])
            }
            RegionGeometry::Point(p) => serde_json::json!(p),
        }
    }
}
