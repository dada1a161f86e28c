use std::f64::consts::PI;

use super::{normalize_angle, Point, PARALLEL_EPSILON, POINT_EPSILON};

/// A directed line segment between two points.
///
/// Length and angle are computed once at construction and reused by every
/// predicate. The angle is the screen-space bearing of `p1 → p2`:
/// `atan2(dy, dx)` with `y` growing downwards, so an angle of `π/2` points
/// down the screen.
#[derive(Clone, Copy, Debug)]
pub struct LineSegment {
    p1: Point,
    p2: Point,
    length: f64,
    angle: f64,
}

/// Intersection of two segments, parameterized on both.
///
/// `t` locates the intersection along the first segment, `u` along the
/// second; both are clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentIntersection {
    pub x: f64,
    pub y: f64,
    pub t: f64,
    pub u: f64,
}

/// Result of projecting a point onto a segment's carrier line.
///
/// `t` is unclamped (values outside `[0, 1]` fall beyond the segment ends),
/// `distance_squared` is measured to the infinite carrier line, and `side` is
/// the sign of the cross product of the segment direction with the vector
/// from `p1` to the query point: `+1` right of the direction of travel in
/// screen space, `-1` left, `0` on the line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPoint {
    pub t: f64,
    pub distance_squared: f64,
    pub side: i8,
}

impl LineSegment {
    pub fn new<P: Into<Point>>(p1: P, p2: P) -> Self {
        let (p1, p2) = (p1.into(), p2.into());
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;
        LineSegment {
            p1,
            p2,
            length: (dx * dx + dy * dy).sqrt(),
            angle: dy.atan2(dx),
        }
    }

    pub fn p1(&self) -> Point {
        self.p1
    }

    pub fn p2(&self) -> Point {
        self.p2
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn dx(&self) -> f64 {
        self.p2.x - self.p1.x
    }

    pub fn dy(&self) -> f64 {
        self.p2.y - self.p1.y
    }

    /// The same segment, traversed the other way.
    pub fn reversed(&self) -> LineSegment {
        LineSegment::new(self.p2, self.p1)
    }

    /// Point at parameter `t` (`0` at `p1`, `1` at `p2`).
    pub fn lerp(&self, t: f64) -> Point {
        Point::new(self.p1.x + self.dx() * t, self.p1.y + self.dy() * t)
    }

    /// Whether this segment runs in the "clockwise" direction used for shape
    /// tracing: left-to-right by more than a pixel, or within a pixel of
    /// vertical and top-to-bottom.
    pub fn clockwise(&self) -> bool {
        if self.dx() > POINT_EPSILON {
            true
        } else if self.dx().abs() <= POINT_EPSILON {
            self.dy() > 0.0
        } else {
            false
        }
    }

    /// Direction-insensitive tolerant equality: the unordered endpoint pairs
    /// coincide.
    pub fn coincident_with(&self, other: &LineSegment) -> bool {
        (self.p1.coincident(&other.p1) && self.p2.coincident(&other.p2))
            || (self.p1.coincident(&other.p2) && self.p2.coincident(&other.p1))
    }

    /// Whether the two carrier lines are parallel within `tolerance` radians.
    ///
    /// The angular difference is normalized into `[0, π/2]`, so direction of
    /// travel does not matter.
    pub fn is_parallel_to_within(&self, other: &LineSegment, tolerance: f64) -> bool {
        let mut diff = (self.angle - other.angle).abs() % PI;
        if diff > PI / 2.0 {
            diff = PI - diff;
        }
        diff <= tolerance
    }

    /// [`is_parallel_to_within`](Self::is_parallel_to_within) at the
    /// crate-wide [`PARALLEL_EPSILON`](super::PARALLEL_EPSILON).
    pub fn is_parallel_to(&self, other: &LineSegment) -> bool {
        self.is_parallel_to_within(other, PARALLEL_EPSILON)
    }

    /// Solves the 2×2 linear system for the crossing of two segments.
    ///
    /// Returns `None` for parallel segments and for crossings falling outside
    /// either segment by more than a pixel's worth of parameter. In-range
    /// results have `t` and `u` clamped to `[0, 1]`, so a crossing within
    /// tolerance of an endpoint reports exactly that endpoint.
    pub fn intersects_at(&self, other: &LineSegment) -> Option<SegmentIntersection> {
        if self.length <= f64::EPSILON || other.length <= f64::EPSILON {
            return None;
        }
        if self.is_parallel_to(other) {
            return None;
        }

        let (dx1, dy1) = (self.dx(), self.dy());
        let (dx2, dy2) = (other.dx(), other.dy());
        let denominator = dx1 * dy2 - dy1 * dx2;
        if denominator == 0.0 {
            return None;
        }

        let ox = other.p1.x - self.p1.x;
        let oy = other.p1.y - self.p1.y;
        let t = (ox * dy2 - oy * dx2) / denominator;
        let u = (ox * dy1 - oy * dx1) / denominator;

        let t_tolerance = POINT_EPSILON / self.length;
        let u_tolerance = POINT_EPSILON / other.length;
        if t < -t_tolerance
            || t > 1.0 + t_tolerance
            || u < -u_tolerance
            || u > 1.0 + u_tolerance
        {
            return None;
        }

        let t = t.clamp(0.0, 1.0);
        let u = u.clamp(0.0, 1.0);
        let at = self.lerp(t);
        Some(SegmentIntersection { x: at.x, y: at.y, t, u })
    }

    /// Projects `(x, y)` onto this segment's carrier line.
    pub fn find_closest_point_on_line_to(&self, x: f64, y: f64) -> ClosestPoint {
        let (dx, dy) = (self.dx(), self.dy());
        let length_squared = dx * dx + dy * dy;
        let vx = x - self.p1.x;
        let vy = y - self.p1.y;

        if length_squared <= f64::EPSILON {
            return ClosestPoint {
                t: 0.0,
                distance_squared: vx * vx + vy * vy,
                side: 0,
            };
        }

        let t = (vx * dx + vy * dy) / length_squared;
        let cross = dx * vy - dy * vx;
        let side = if cross.abs() <= f64::EPSILON * length_squared.max(1.0) {
            0
        } else if cross > 0.0 {
            1
        } else {
            -1
        };
        ClosestPoint {
            t,
            distance_squared: cross * cross / length_squared,
            side,
        }
    }

    /// Clockwise interior angle from this segment to `other`, in `[0, 2π)`.
    ///
    /// Assumes `other` starts where `self` ends and the surrounding polygon
    /// is traced clockwise, so a square corner reports `π/2` and a reflex
    /// corner reports `3π/2`.
    pub fn angle_between(&self, other: &LineSegment) -> f64 {
        normalize_angle(self.angle - other.angle + PI)
    }

    /// Whether this segment's direction falls between `a` and `b`: the angle
    /// from `a` to `self` is smaller than the angle from `a` to `b`.
    pub fn is_between(&self, a: &LineSegment, b: &LineSegment) -> bool {
        a.angle_between(self) < a.angle_between(b)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> LineSegment {
        LineSegment::new((x1, y1), (x2, y2))
    }

    #[test]
    fn clockwise_direction_flag() {
        // left-to-right
        assert!(seg(0.0, 0.0, 100.0, 0.0).clockwise());
        // right-to-left
        assert!(!seg(100.0, 0.0, 0.0, 0.0).clockwise());
        // vertical, top-to-bottom
        assert!(seg(0.0, 0.0, 0.0, 100.0).clockwise());
        // vertical, bottom-to-top
        assert!(!seg(0.0, 100.0, 0.0, 0.0).clockwise());
        // near-vertical within a pixel still uses the vertical rule
        assert!(seg(0.0, 0.0, 0.5, 100.0).clockwise());
        assert!(!seg(0.5, 100.0, 0.0, 0.0).clockwise());
    }

    #[test]
    fn parallel_is_direction_insensitive() {
        let a = seg(0.0, 0.0, 100.0, 0.0);
        assert!(a.is_parallel_to(&seg(0.0, 50.0, 100.0, 50.0)));
        assert!(a.is_parallel_to(&seg(100.0, 50.0, 0.0, 50.0)));
        assert!(a.is_parallel_to(&seg(0.0, 0.0, 100.0, 4.0))); // 0.04 rad
        assert!(!a.is_parallel_to(&seg(0.0, 0.0, 100.0, 10.0)));
        assert!(!a.is_parallel_to(&seg(0.0, 0.0, 0.0, 100.0)));
    }

    #[test]
    fn intersection_parameters() {
        let ray = seg(-50.0, 50.0, 150.0, 50.0);
        let edge = seg(0.0, 100.0, 0.0, 0.0);
        let hit = ray.intersects_at(&edge).unwrap();
        assert_relative_eq!(hit.t, 0.25);
        assert_relative_eq!(hit.u, 0.5);
        assert_relative_eq!(hit.x, 0.0);
        assert_relative_eq!(hit.y, 50.0);
    }

    #[test]
    fn intersection_misses_are_none() {
        let a = seg(0.0, 0.0, 100.0, 0.0);
        // parallel
        assert!(a.intersects_at(&seg(0.0, 10.0, 100.0, 10.0)).is_none());
        // crossing far beyond the other segment's end
        assert!(a.intersects_at(&seg(50.0, 10.0, 50.0, 200.0)).is_none());
    }

    #[test]
    fn near_endpoint_intersections_clamp() {
        let a = seg(0.0, 0.0, 100.0, 0.0);
        // crosses 0.5 px beyond a's end: within tolerance, clamped to t = 1
        let hit = a.intersects_at(&seg(100.5, -50.0, 100.5, 50.0)).unwrap();
        assert_relative_eq!(hit.t, 1.0);
        // 2 px beyond is out of tolerance
        assert!(a.intersects_at(&seg(102.0, -50.0, 102.0, 50.0)).is_none());
    }

    #[test]
    fn closest_point_side_signs() {
        let a = seg(0.0, 0.0, 100.0, 0.0);
        // below the segment in screen space (y down) is the right-hand side
        assert_eq!(a.find_closest_point_on_line_to(50.0, 10.0).side, 1);
        assert_eq!(a.find_closest_point_on_line_to(50.0, -10.0).side, -1);
        assert_eq!(a.find_closest_point_on_line_to(50.0, 0.0).side, 0);

        let c = a.find_closest_point_on_line_to(25.0, 10.0);
        assert_relative_eq!(c.t, 0.25);
        assert_relative_eq!(c.distance_squared, 100.0);

        // unclamped parameter beyond the ends
        assert_relative_eq!(a.find_closest_point_on_line_to(150.0, 0.0).t, 1.5);
    }

    #[test]
    fn interior_angles_on_a_clockwise_square() {
        // square traced clockwise in screen space
        let top = seg(0.0, 0.0, 100.0, 0.0);
        let right = seg(100.0, 0.0, 100.0, 100.0);
        assert_relative_eq!(top.angle_between(&right), PI / 2.0);

        // reflex corner of an L-shape
        let incoming = seg(200.0, 100.0, 100.0, 100.0);
        let outgoing = seg(100.0, 100.0, 100.0, 200.0);
        assert_relative_eq!(incoming.angle_between(&outgoing), 3.0 * PI / 2.0);
    }

    #[test]
    fn is_between_orders_by_turn() {
        let incoming = seg(0.0, 0.0, 100.0, 0.0);
        let down = seg(100.0, 0.0, 100.0, 100.0);
        let diag_inside = seg(100.0, 0.0, 50.0, 50.0);
        let diag_outside = seg(100.0, 0.0, 150.0, -50.0);
        assert!(diag_inside.is_between(&incoming, &down));
        assert!(!diag_outside.is_between(&incoming, &down));
    }
}
