use super::POINT_EPSILON;

/// An immutable position on the 2-dimensional pixel plane.
///
/// Scene pixel space is screen-oriented: `x` grows rightwards, `y` grows
/// downwards. Exact comparison is available through `PartialEq`; geometric
/// code almost always wants [`Point::coincident`] instead, which applies the
/// crate-wide pixel tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Squared euclidean distance to `other`.
    pub fn distance_squared_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Tolerant equality: true when `other` lies within
    /// [`POINT_EPSILON`](super::POINT_EPSILON) pixels.
    pub fn coincident(&self, other: &Point) -> bool {
        self.distance_squared_to(other) <= POINT_EPSILON * POINT_EPSILON
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}
