//! Geometry for `geo_point` and `geo_shape` fields.
//!
//! Shapes are planar, in degrees (`lon`, `lat`). Polygon rings are kept
//! unclosed in memory; WKT output repeats the first vertex.

use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Vertices used to approximate a circle when buffering.
const BUFFER_SEGMENTS: usize = 32;

/// A position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Creates a point after checking coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if latitude is outside `[-90, 90]` or longitude
    /// outside `[-180, 180]`.
    pub fn checked(lon: f64, lat: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} out of range"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {lon} out of range"));
        }
        Ok(Self { lon, lat })
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum longitude.
    pub min_lon: f64,
    /// Minimum latitude.
    pub min_lat: f64,
    /// Maximum longitude.
    pub max_lon: f64,
    /// Maximum latitude.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a bounding box.
    #[must_use]
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Returns true if `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        (self.min_lon..=self.max_lon).contains(&point.lon)
            && (self.min_lat..=self.max_lat).contains(&point.lat)
    }

    /// Returns true if the boxes overlap.
    #[must_use]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

/// A geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A single position.
    Point(Point),
    /// An open path.
    LineString(Vec<Point>),
    /// A polygon with optional holes.
    Polygon {
        /// Outer ring.
        exterior: Vec<Point>,
        /// Inner rings.
        holes: Vec<Vec<Point>>,
    },
}

impl Shape {
    /// Parses `POINT`, `LINESTRING` or `POLYGON` well-known text.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first syntax problem.
    pub fn parse_wkt(text: &str) -> Result<Self, String> {
        let text = text.trim();
        let open = text
            .find('(')
            .ok_or_else(|| format!("missing '(' in WKT {text:?}"))?;
        let kind = text[..open].trim().to_ascii_uppercase();
        let body = text[open..].trim();
        let inner = strip_parens(body)?;

        match kind.as_str() {
            "POINT" => {
                let points = parse_points(inner)?;
                match points.as_slice() {
                    [p] => Ok(Shape::Point(*p)),
                    _ => Err("POINT takes exactly one position".to_string()),
                }
            }
            "LINESTRING" => {
                let points = parse_points(inner)?;
                if points.len() < 2 {
                    return Err("LINESTRING needs at least two positions".to_string());
                }
                Ok(Shape::LineString(points))
            }
            "POLYGON" => {
                let mut rings = Vec::new();
                for ring in split_rings(inner)? {
                    let mut points = parse_points(ring)?;
                    if points.len() > 1 && points.first() == points.last() {
                        points.pop();
                    }
                    if points.len() < 3 {
                        return Err("polygon ring needs at least three positions".to_string());
                    }
                    rings.push(points);
                }
                let mut rings = rings.into_iter();
                let exterior = rings
                    .next()
                    .ok_or_else(|| "POLYGON has no rings".to_string())?;
                Ok(Shape::Polygon {
                    exterior,
                    holes: rings.collect(),
                })
            }
            other => Err(format!("unsupported WKT shape {other:?}")),
        }
    }

    /// Renders the shape as well-known text.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        self.to_string()
    }

    /// Returns every vertex of the shape, holes included.
    pub fn points(&self) -> Vec<Point> {
        match self {
            Shape::Point(p) => vec![*p],
            Shape::LineString(points) => points.clone(),
            Shape::Polygon { exterior, holes } => exterior
                .iter()
                .chain(holes.iter().flatten())
                .copied()
                .collect(),
        }
    }

    /// Returns the bounding box of the shape.
    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in self.points() {
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lon = bbox.max_lon.max(p.lon);
            bbox.max_lat = bbox.max_lat.max(p.lat);
        }
        bbox
    }

    /// Returns the centroid: the vertex itself, the length-weighted
    /// centre of a path, or the area-weighted centre of a polygon.
    #[must_use]
    pub fn centroid(&self) -> Point {
        match self {
            Shape::Point(p) => *p,
            Shape::LineString(points) => line_centroid(points),
            Shape::Polygon { exterior, holes } => {
                let (mut area, mut cx, mut cy) = ring_moments(exterior);
                for hole in holes {
                    let (a, x, y) = ring_moments(hole);
                    // Holes subtract regardless of their winding.
                    let sign = if (a < 0.0) == (area < 0.0) { -1.0 } else { 1.0 };
                    area += sign * a;
                    cx += sign * x;
                    cy += sign * y;
                }
                if area.abs() < f64::EPSILON {
                    return line_centroid(exterior);
                }
                Point::new(cx / (6.0 * area), cy / (6.0 * area))
            }
        }
    }

    /// Returns the convex hull of the shape's vertices.
    #[must_use]
    pub fn convex_hull(&self) -> Shape {
        hull_shape(convex_hull(self.points()))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn ring(f: &mut fmt::Formatter<'_>, points: &[Point], close: bool) -> fmt::Result {
            f.write_str("(")?;
            for (i, p) in points.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} {}", p.lon, p.lat)?;
            }
            if close {
                if let Some(first) = points.first() {
                    write!(f, ", {} {}", first.lon, first.lat)?;
                }
            }
            f.write_str(")")
        }

        match self {
            Shape::Point(p) => write!(f, "POINT ({} {})", p.lon, p.lat),
            Shape::LineString(points) => {
                f.write_str("LINESTRING ")?;
                ring(f, points, false)
            }
            Shape::Polygon { exterior, holes } => {
                f.write_str("POLYGON (")?;
                ring(f, exterior, true)?;
                for hole in holes {
                    f.write_str(", ")?;
                    ring(f, hole, true)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn strip_parens(text: &str) -> Result<&str, String> {
    text.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .map(str::trim)
        .ok_or_else(|| format!("unbalanced parentheses in {text:?}"))
}

fn parse_points(text: &str) -> Result<Vec<Point>, String> {
    text.split(',')
        .map(|pair| {
            let mut coords = pair.split_whitespace().map(f64::from_str);
            match (coords.next(), coords.next(), coords.next()) {
                (Some(Ok(lon)), Some(Ok(lat)), None) => Ok(Point::new(lon, lat)),
                _ => Err(format!("invalid position {:?}", pair.trim())),
            }
        })
        .collect()
}

fn split_rings(text: &str) -> Result<Vec<&str>, String> {
    let mut rings = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                depth += 1;
                if depth == 1 {
                    start = Some(i + 1);
                }
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced parentheses".to_string())?;
                if depth == 0 {
                    let from = start.take().unwrap_or(i);
                    rings.push(text[from..i].trim());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses".to_string());
    }
    Ok(rings)
}

fn line_centroid(points: &[Point]) -> Point {
    let mut total = 0.0;
    let (mut x, mut y) = (0.0, 0.0);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let len = (b.lon - a.lon).hypot(b.lat - a.lat);
        total += len;
        x += len * (a.lon + b.lon) / 2.0;
        y += len * (a.lat + b.lat) / 2.0;
    }
    if total < f64::EPSILON {
        return points.first().copied().unwrap_or(Point::new(0.0, 0.0));
    }
    Point::new(x / total, y / total)
}

/// Signed area and first moments of a closed ring (shoelace).
fn ring_moments(ring: &[Point]) -> (f64, f64, f64) {
    let (mut area, mut cx, mut cy) = (0.0, 0.0, 0.0);
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        let cross = a.lon * b.lat - b.lon * a.lat;
        area += cross;
        cx += (a.lon + b.lon) * cross;
        cy += (a.lat + b.lat) * cross;
    }
    (area / 2.0, cx, cy)
}

/// Andrew's monotone chain; returns the hull counter-clockwise.
fn convex_hull(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_by(|a, b| a.lon.total_cmp(&b.lon).then(a.lat.total_cmp(&b.lat)));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    fn cross(o: Point, a: Point, b: Point) -> f64 {
        (a.lon - o.lon) * (b.lat - o.lat) - (a.lat - o.lat) * (b.lon - o.lon)
    }

    let mut lower: Vec<Point> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn hull_shape(hull: Vec<Point>) -> Shape {
    match hull.len() {
        0 => Shape::Point(Point::new(0.0, 0.0)),
        1 => Shape::Point(hull[0]),
        2 => Shape::LineString(hull),
        _ => Shape::Polygon {
            exterior: hull,
            holes: Vec::new(),
        },
    }
}

/// Convex polygonal approximation of the shape grown by `degrees`.
fn buffered(shape: &Shape, degrees: f64) -> Shape {
    let mut points = Vec::new();
    for p in convex_hull(shape.points()) {
        for i in 0..BUFFER_SEGMENTS {
            #[allow(clippy::cast_precision_loss)]
            let angle = std::f64::consts::TAU * i as f64 / BUFFER_SEGMENTS as f64;
            points.push(Point::new(
                p.lon + degrees * angle.cos(),
                p.lat + degrees * angle.sin(),
            ));
        }
    }
    hull_shape(convex_hull(points))
}

/// Unit of a [`GeoDistance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    /// Millimetres.
    Millimetres,
    /// Centimetres.
    Centimetres,
    /// Metres.
    Metres,
    /// Kilometres.
    Kilometres,
    /// Inches.
    Inches,
    /// Feet.
    Feet,
    /// Yards.
    Yards,
    /// Miles.
    Miles,
    /// Nautical miles.
    NauticalMiles,
}

impl DistanceUnit {
    const ALL: [(&'static str, DistanceUnit); 9] = [
        ("mm", DistanceUnit::Millimetres),
        ("cm", DistanceUnit::Centimetres),
        ("km", DistanceUnit::Kilometres),
        ("nmi", DistanceUnit::NauticalMiles),
        ("mi", DistanceUnit::Miles),
        ("yd", DistanceUnit::Yards),
        ("ft", DistanceUnit::Feet),
        ("in", DistanceUnit::Inches),
        ("m", DistanceUnit::Metres),
    ];

    /// Metres per unit.
    #[must_use]
    pub const fn metres(self) -> f64 {
        match self {
            Self::Millimetres => 0.001,
            Self::Centimetres => 0.01,
            Self::Metres => 1.0,
            Self::Kilometres => 1000.0,
            Self::Inches => 0.0254,
            Self::Feet => 0.3048,
            Self::Yards => 0.9144,
            Self::Miles => 1609.344,
            Self::NauticalMiles => 1852.0,
        }
    }

    fn suffix(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, unit)| *unit == self)
            .map_or("m", |(suffix, _)| suffix)
    }
}

/// A distance such as `10km` or `0.5mi`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeoDistance {
    value: f64,
    unit: DistanceUnit,
}

impl GeoDistance {
    /// Creates a distance.
    #[must_use]
    pub const fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    /// Returns the distance in metres.
    #[must_use]
    pub fn metres(&self) -> f64 {
        self.value * self.unit.metres()
    }

    /// Returns the distance as degrees of arc on a spherical earth.
    #[must_use]
    pub fn degrees(&self) -> f64 {
        (self.metres() / EARTH_RADIUS_M).to_degrees()
    }
}

impl FromStr for GeoDistance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number, unit) = DistanceUnit::ALL
            .iter()
            .find_map(|(suffix, unit)| s.strip_suffix(suffix).map(|n| (n, *unit)))
            .unwrap_or((s, DistanceUnit::Metres));
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid distance {s:?}"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("distance {s:?} must be a non-negative number"));
        }
        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for GeoDistance {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GeoDistance> for String {
    fn from(distance: GeoDistance) -> Self {
        distance.to_string()
    }
}

impl fmt::Display for GeoDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// Transformation applied to a shape before it is indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeoTransformation {
    /// Replace the shape with its bounding box.
    #[serde(rename = "bbox")]
    BBox,
    /// Grow the shape by `max_distance`, optionally cutting out the area
    /// within `min_distance`.
    Buffer {
        /// Inner distance; the area closer than this becomes a hole.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_distance: Option<GeoDistance>,
        /// Outer distance.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_distance: Option<GeoDistance>,
    },
    /// Replace the shape with its centroid.
    Centroid,
    /// Replace the shape with its convex hull.
    ConvexHull,
}

impl GeoTransformation {
    /// Checks the transformation's parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer's inner distance is not smaller than
    /// its outer distance, or an inner distance has no outer distance.
    pub fn validate(&self) -> IndexResult<()> {
        if let GeoTransformation::Buffer {
            min_distance: Some(min),
            max_distance,
        } = self
        {
            match max_distance {
                Some(max) if min.metres() < max.metres() => {}
                Some(_) => {
                    return Err(IndexError::invalid_schema(
                        "buffer min_distance must be smaller than max_distance",
                    ))
                }
                None => {
                    return Err(IndexError::invalid_schema(
                        "buffer min_distance requires max_distance",
                    ))
                }
            }
        }
        Ok(())
    }

    /// Applies the transformation.
    #[must_use]
    pub fn apply(&self, shape: &Shape) -> Shape {
        match self {
            GeoTransformation::BBox => {
                let b = shape.bbox();
                Shape::Polygon {
                    exterior: vec![
                        Point::new(b.min_lon, b.min_lat),
                        Point::new(b.max_lon, b.min_lat),
                        Point::new(b.max_lon, b.max_lat),
                        Point::new(b.min_lon, b.max_lat),
                    ],
                    holes: Vec::new(),
                }
            }
            GeoTransformation::Buffer {
                min_distance,
                max_distance,
            } => {
                let outer = match max_distance {
                    Some(max) => buffered(shape, max.degrees()),
                    None => return shape.clone(),
                };
                match (outer, min_distance) {
                    (Shape::Polygon { exterior, .. }, Some(min)) => {
                        let hole = match buffered(shape, min.degrees()) {
                            Shape::Polygon { exterior, .. } => vec![exterior],
                            _ => Vec::new(),
                        };
                        Shape::Polygon {
                            exterior,
                            holes: hole,
                        }
                    }
                    (outer, _) => outer,
                }
            }
            GeoTransformation::Centroid => Shape::Point(shape.centroid()),
            GeoTransformation::ConvexHull => shape.convex_hull(),
        }
    }
}
