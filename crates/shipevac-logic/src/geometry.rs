//! Planar geometry primitives for deck layouts.
//!
//! Points, axis-aligned boxes and polygon helpers. Pure functions over plain
//! `f32` data; everything else in the crate is built on top of these.

use serde::{Deserialize, Serialize};

use crate::constants::geometry::EPSILON;

/// A point (or displacement) on the deck plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: &Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Rotate counter-clockwise about the origin by `angle` radians.
    pub fn rotated(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Unit vector at `angle` radians from the +x axis.
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { x: cos, y: sin }
    }
}

impl std::ops::Add for Point2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl std::ops::Sub for Point2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl std::ops::Mul<f32> for Point2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    /// Smallest box holding every point. `None` for an empty slice.
    pub fn from_points(points: &[Point2]) -> Option<Self> {
        let first = points.first()?;
        let mut aabb = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &points[1..] {
            aabb.min_x = aabb.min_x.min(p.x);
            aabb.min_y = aabb.min_y.min(p.y);
            aabb.max_x = aabb.max_x.max(p.x);
            aabb.max_y = aabb.max_y.max(p.y);
        }
        Some(aabb)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Inclusive containment.
    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Inclusive overlap; touching boxes overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// Iterate the closed edge loop of a polygon: (v0,v1), (v1,v2), …, (vn,v0).
pub fn polygon_edges(polygon: &[Point2]) -> impl Iterator<Item = (Point2, Point2)> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| (polygon[i], polygon[(i + 1) % n]))
}

/// Even–odd ray-casting containment test.
///
/// Casts a ray toward +x and counts edge crossings. Degenerate polygons
/// (fewer than 3 vertices) contain nothing.
pub fn point_in_polygon(p: Point2, polygon: &[Point2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    for (a, b) in polygon_edges(polygon) {
        // Half-open rule on y so a vertex shared by two edges counts once
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Cross product of (b - a) × (c - a) with a tolerance scaled to the
/// operand lengths. Returns -1, 0 or 1.
fn orientation(a: Point2, b: Point2, c: Point2) -> i8 {
    let ab = b - a;
    let ac = c - a;
    let cross = ab.cross(&ac);
    let tolerance = EPSILON * (ab.length() * ac.length()).max(1.0);
    if cross > tolerance {
        1
    } else if cross < -tolerance {
        -1
    } else {
        0
    }
}

/// `p` lies within the bounding box of segment ab (assumes collinearity).
fn within_segment_bounds(a: Point2, b: Point2, p: Point2) -> bool {
    let tol = EPSILON * a.distance(&b).max(1.0);
    p.x >= a.x.min(b.x) - tol
        && p.x <= a.x.max(b.x) + tol
        && p.y >= a.y.min(b.y) - tol
        && p.y <= a.y.max(b.y) + tol
}

/// Segment ab intersects segment cd, including touching and collinear overlap.
pub fn segments_intersect(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 != o2 && o3 != o4 && o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0 {
        return true;
    }

    (o1 == 0 && within_segment_bounds(a, b, c))
        || (o2 == 0 && within_segment_bounds(a, b, d))
        || (o3 == 0 && within_segment_bounds(c, d, a))
        || (o4 == 0 && within_segment_bounds(c, d, b))
}

/// Euclidean distance from `p` to the closed segment ab.
pub fn point_to_segment_distance(p: Point2, a: Point2, b: Point2) -> f32 {
    let ab = b - a;
    let len_sq = ab.dot(&ab);
    if len_sq <= f32::EPSILON {
        return p.distance(&a);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    p.distance(&(a + ab * t))
}

/// Distance from `p` to the nearest polygon edge. Infinite for an empty
/// polygon, point distance for a single vertex.
pub fn point_to_polygon_edge_distance(p: Point2, polygon: &[Point2]) -> f32 {
    match polygon.len() {
        0 => f32::INFINITY,
        1 => p.distance(&polygon[0]),
        _ => polygon_edges(polygon)
            .map(|(a, b)| point_to_segment_distance(p, a, b))
            .fold(f32::INFINITY, f32::min),
    }
}

/// Shoelace signed area; positive for counter-clockwise winding.
pub fn signed_area(polygon: &[Point2]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    polygon_edges(polygon).map(|(a, b)| a.cross(&b)).sum::<f32>() / 2.0
}

/// Vertex average. Good enough as a reference point for convex-ish outlines.
pub fn polygon_centroid(polygon: &[Point2]) -> Option<Point2> {
    if polygon.is_empty() {
        return None;
    }
    let n = polygon.len() as f32;
    let sum = polygon.iter().fold(Point2::ORIGIN, |acc, p| acc + *p);
    Some(sum * (1.0 / n))
}
