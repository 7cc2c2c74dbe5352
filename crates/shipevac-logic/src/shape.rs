//! Bounding shapes for decks, compartments, stations and agents.
//!
//! `Shape` is a closed enum over a rotated rectangle and an absolute polygon.
//! Both variants answer the same questions (containment, intersection,
//! margin expansion) so movement code never branches on the variant.

use serde::{Deserialize, Serialize};

use crate::geometry::{
    point_in_polygon, point_to_polygon_edge_distance, polygon_centroid, polygon_edges,
    segments_intersect, signed_area, Aabb, Point2,
};

/// Longest a polygon vertex may move when expanded, as a multiple of the
/// margin. Caps miter spikes at very sharp corners.
const MAX_MITER: f32 = 4.0;

/// Rectangle given by center, extents and rotation.
///
/// `length` runs along the local x axis, `width` along the local y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub center: Point2,
    pub length: f32,
    pub width: f32,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
}

impl RectShape {
    pub fn new(center: Point2, length: f32, width: f32, rotation: f32) -> Self {
        Self {
            center,
            length,
            width,
            rotation,
        }
    }

    pub fn axis_aligned(center: Point2, length: f32, width: f32) -> Self {
        Self::new(center, length, width, 0.0)
    }

    pub fn half_length(&self) -> f32 {
        self.length / 2.0
    }

    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    /// Express a deck point in the rectangle's own frame.
    pub fn to_local(&self, p: Point2) -> Point2 {
        (p - self.center).rotated(-self.rotation)
    }

    pub fn contains_point(&self, p: Point2) -> bool {
        let local = self.to_local(p);
        local.x.abs() <= self.half_length() && local.y.abs() <= self.half_width()
    }

    /// Corners in counter-clockwise order (before rotation: bottom-left first).
    pub fn corners(&self) -> [Point2; 4] {
        let hl = self.half_length();
        let hw = self.half_width();
        [
            Point2::new(-hl, -hw),
            Point2::new(hl, -hw),
            Point2::new(hl, hw),
            Point2::new(-hl, hw),
        ]
        .map(|c| c.rotated(self.rotation) + self.center)
    }
}

/// Polygon with an absolute outline in deck coordinates.
///
/// The outline is owned and never edited in place; moves produce a new shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonShape {
    outline: Vec<Point2>,
    aabb: Aabb,
}

impl PolygonShape {
    /// Build from an outline. `None` when fewer than 3 vertices.
    pub fn new(outline: Vec<Point2>) -> Option<Self> {
        if outline.len() < 3 {
            return None;
        }
        let aabb = Aabb::from_points(&outline)?;
        Some(Self { outline, aabb })
    }

    pub fn outline(&self) -> &[Point2] {
        &self.outline
    }

    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    pub fn contains_point(&self, p: Point2) -> bool {
        self.aabb.contains(p) && point_in_polygon(p, &self.outline)
    }

    /// Offset each vertex along the bisector of its two edge normals.
    fn offset(&self, margin: f32) -> Self {
        let n = self.outline.len();
        // Outward normal of edge a→b is (dy, -dx) for counter-clockwise winding
        let winding = if signed_area(&self.outline) >= 0.0 { 1.0 } else { -1.0 };
        let normal = |a: Point2, b: Point2| -> Point2 {
            let d = b - a;
            let len = d.length();
            if len <= f32::EPSILON {
                Point2::ORIGIN
            } else {
                Point2::new(d.y, -d.x) * (winding / len)
            }
        };

        let outline = (0..n)
            .map(|i| {
                let prev = self.outline[(i + n - 1) % n];
                let cur = self.outline[i];
                let next = self.outline[(i + 1) % n];
                let n1 = normal(prev, cur);
                let n2 = normal(cur, next);
                let bisector = n1 + n2;
                let len = bisector.length();
                if len <= f32::EPSILON {
                    return cur + n1 * margin;
                }
                let dir = bisector * (1.0 / len);
                // Miter length keeps both adjacent edges exactly `margin` away
                let cos_half = dir.dot(&n1).max(1.0 / MAX_MITER);
                cur + dir * (margin / cos_half)
            })
            .collect::<Vec<_>>();
        let aabb = Aabb::from_points(&outline).unwrap_or(self.aabb);
        Self { outline, aabb }
    }

    fn translated(&self, delta: Point2) -> Self {
        Self {
            outline: self.outline.iter().map(|p| *p + delta).collect(),
            aabb: Aabb {
                min_x: self.aabb.min_x + delta.x,
                min_y: self.aabb.min_y + delta.y,
                max_x: self.aabb.max_x + delta.x,
                max_y: self.aabb.max_y + delta.y,
            },
        }
    }
}

/// Bounding volume of any deck entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Rectangle(RectShape),
    Polygon(PolygonShape),
}

impl Shape {
    pub fn rectangle(center: Point2, length: f32, width: f32, rotation: f32) -> Self {
        Shape::Rectangle(RectShape::new(center, length, width, rotation))
    }

    /// Axis-aligned square centered on `center`; used for agent bodies.
    pub fn square(center: Point2, side: f32) -> Self {
        Shape::Rectangle(RectShape::axis_aligned(center, side, side))
    }

    pub fn polygon(outline: Vec<Point2>) -> Option<Self> {
        PolygonShape::new(outline).map(Shape::Polygon)
    }

    pub fn contains_point(&self, p: Point2) -> bool {
        match self {
            Shape::Rectangle(r) => r.contains_point(p),
            Shape::Polygon(poly) => poly.contains_point(p),
        }
    }

    /// Vertex loop, counter-clockwise for rectangles, as given for polygons.
    pub fn vertices(&self) -> Vec<Point2> {
        match self {
            Shape::Rectangle(r) => r.corners().to_vec(),
            Shape::Polygon(poly) => poly.outline.clone(),
        }
    }

    pub fn aabb(&self) -> Aabb {
        match self {
            Shape::Rectangle(r) if r.rotation == 0.0 => Aabb {
                min_x: r.center.x - r.half_length(),
                min_y: r.center.y - r.half_width(),
                max_x: r.center.x + r.half_length(),
                max_y: r.center.y + r.half_width(),
            },
            Shape::Rectangle(r) => Aabb::from_points(&r.corners()).unwrap_or(Aabb {
                min_x: r.center.x,
                min_y: r.center.y,
                max_x: r.center.x,
                max_y: r.center.y,
            }),
            Shape::Polygon(poly) => poly.aabb,
        }
    }

    /// Rectangle center or polygon vertex average.
    pub fn center(&self) -> Point2 {
        match self {
            Shape::Rectangle(r) => r.center,
            Shape::Polygon(poly) => polygon_centroid(&poly.outline).unwrap_or(Point2::ORIGIN),
        }
    }

    /// Three-stage overlap test: bounding boxes, vertex containment, edge
    /// crossings. Touching counts as intersecting.
    pub fn intersects(&self, other: &Shape) -> bool {
        if !self.aabb().overlaps(&other.aabb()) {
            return false;
        }

        let ours = self.vertices();
        let theirs = other.vertices();
        if theirs.iter().any(|p| self.contains_point(*p))
            || ours.iter().any(|p| other.contains_point(*p))
        {
            return true;
        }

        let crossing = polygon_edges(&ours)
            .any(|(a, b)| polygon_edges(&theirs).any(|(c, d)| segments_intersect(a, b, c, d)));
        crossing
    }

    /// A new shape grown outward by `margin` (negative shrinks).
    ///
    /// Meant for proximity checks only, not for drawing.
    pub fn expanded_by(&self, margin: f32) -> Shape {
        match self {
            Shape::Rectangle(r) => Shape::Rectangle(RectShape {
                length: (r.length + 2.0 * margin).max(0.0),
                width: (r.width + 2.0 * margin).max(0.0),
                ..*r
            }),
            Shape::Polygon(poly) => Shape::Polygon(poly.offset(margin)),
        }
    }

    /// Distance from `p` to the nearest boundary edge.
    pub fn boundary_distance(&self, p: Point2) -> f32 {
        match self {
            Shape::Rectangle(r) => point_to_polygon_edge_distance(p, &r.corners()),
            Shape::Polygon(poly) => point_to_polygon_edge_distance(p, &poly.outline),
        }
    }

    /// Inside, and at least `margin` away from every edge.
    pub fn contains_with_clearance(&self, p: Point2, margin: f32) -> bool {
        self.contains_point(p) && self.boundary_distance(p) >= margin
    }

    /// `other` lies entirely inside `self`: every vertex inside and no edge
    /// of `other` crossing an edge of `self`.
    pub fn contains_shape(&self, other: &Shape) -> bool {
        let theirs = other.vertices();
        if !theirs.iter().all(|p| self.contains_point(*p)) {
            return false;
        }
        let ours = self.vertices();
        let crossing = polygon_edges(&theirs)
            .any(|(a, b)| polygon_edges(&ours).any(|(c, d)| segments_intersect(a, b, c, d)));
        !crossing
    }

    /// Same shape moved by `(dx, dy)`.
    pub fn translated(&self, dx: f32, dy: f32) -> Shape {
        let delta = Point2::new(dx, dy);
        match self {
            Shape::Rectangle(r) => Shape::Rectangle(RectShape {
                center: r.center + delta,
                ..*r
            }),
            Shape::Polygon(poly) => Shape::Polygon(poly.translated(delta)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn square_poly(x0: f32, y0: f32, side: f32) -> Shape {
        Shape::polygon(vec![
            Point2::new(x0, y0),
            Point2::new(x0 + side, y0),
            Point2::new(x0 + side, y0 + side),
            Point2::new(x0, y0 + side),
        ])
        .unwrap()
    }

    #[test]
    fn rectangle_contains_axis_aligned() {
        let r = Shape::rectangle(Point2::new(2.0, 1.0), 4.0, 2.0, 0.0);
        assert!(r.contains_point(Point2::new(3.9, 1.9)));
        assert!(!r.contains_point(Point2::new(4.1, 1.0)));
        assert!(!r.contains_point(Point2::new(2.0, 2.1)));
    }

    #[test]
    fn rotated_rectangle_excludes_bounding_box_corner() {
        // A 2×2 square rotated 45° is a diamond; (0.9, 0.9) is inside its
        // AABB but outside the diamond.
        let r = Shape::rectangle(Point2::ORIGIN, 2.0, 2.0, FRAC_PI_4);
        assert!(r.contains_point(Point2::new(0.0, 1.3)));
        assert!(!r.contains_point(Point2::new(0.9, 0.9)));
        assert!(r.aabb().contains(Point2::new(0.9, 0.9)));
    }

    #[test]
    fn polygon_rejects_short_outline() {
        assert!(Shape::polygon(vec![Point2::ORIGIN, Point2::new(1.0, 0.0)]).is_none());
    }

    #[test]
    fn polygon_and_rectangle_overlap() {
        let poly = square_poly(0.0, 0.0, 2.0);
        let near = Shape::square(Point2::new(2.2, 1.0), 0.6);
        let far = Shape::square(Point2::new(3.0, 1.0), 0.6);
        assert!(poly.intersects(&near));
        assert!(near.intersects(&poly));
        assert!(!poly.intersects(&far));
    }

    #[test]
    fn crossing_without_vertex_containment() {
        // A plus sign: neither rectangle has a vertex inside the other
        let horizontal = Shape::rectangle(Point2::ORIGIN, 6.0, 1.0, 0.0);
        let vertical = Shape::rectangle(Point2::ORIGIN, 1.0, 6.0, 0.0);
        assert!(horizontal.intersects(&vertical));
    }

    #[test]
    fn rotated_rectangles_separated_along_diagonal() {
        // AABBs overlap but the diamonds do not touch
        let a = Shape::rectangle(Point2::ORIGIN, 2.0, 2.0, FRAC_PI_4);
        let b = Shape::rectangle(Point2::new(1.6, 1.6), 2.0, 2.0, FRAC_PI_4);
        assert!(a.aabb().overlaps(&b.aabb()));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn expanded_rectangle_grows_each_side() {
        let r = Shape::rectangle(Point2::ORIGIN, 2.0, 2.0, 0.0).expanded_by(0.5);
        assert!(r.contains_point(Point2::new(1.4, 0.0)));
        assert!(!r.contains_point(Point2::new(1.6, 0.0)));
    }

    #[test]
    fn expanded_polygon_keeps_margin_for_either_winding() {
        let ccw = square_poly(0.0, 0.0, 2.0);
        let mut cw_outline = ccw.vertices();
        cw_outline.reverse();
        let cw = Shape::polygon(cw_outline).unwrap();
        for shape in [ccw, cw] {
            let grown = shape.expanded_by(0.5);
            assert!(grown.contains_point(Point2::new(-0.4, 1.0)));
            assert!(grown.contains_point(Point2::new(2.4, 2.4)));
            assert!(!grown.contains_point(Point2::new(-0.6, 1.0)));
        }
    }

    #[test]
    fn clearance_measures_distance_to_edge() {
        let deck = Shape::rectangle(Point2::ORIGIN, 10.0, 10.0, 0.0);
        assert!(deck.contains_with_clearance(Point2::new(4.0, 0.0), 0.5));
        assert!(!deck.contains_with_clearance(Point2::new(4.8, 0.0), 0.5));
        assert!(!deck.contains_with_clearance(Point2::new(6.0, 0.0), 0.0));
    }

    #[test]
    fn contains_shape_detects_wall_crossing() {
        let room = Shape::rectangle(Point2::ORIGIN, 4.0, 4.0, 0.0);
        assert!(room.contains_shape(&Shape::square(Point2::ORIGIN, 0.6)));
        assert!(!room.contains_shape(&Shape::square(Point2::new(1.9, 0.0), 0.6)));
    }

    #[test]
    fn translated_polygon_is_new_value() {
        let poly = square_poly(0.0, 0.0, 1.0);
        let moved = poly.translated(3.0, -1.0);
        assert!(moved.contains_point(Point2::new(3.5, -0.5)));
        assert!(poly.contains_point(Point2::new(0.5, 0.5)));
        assert_eq!(moved.aabb().min_x, 3.0);
    }
}
