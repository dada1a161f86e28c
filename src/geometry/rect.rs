use super::Point;

/// An axis-aligned bounding rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Builds a rect from two corners, normalizing min/max per axis.
    pub fn new<P: Into<Point>>(a: P, b: P) -> Self {
        let (a, b) = (a.into(), b.into());
        Rect {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Smallest rect enclosing all `points`. Returns `None` for an empty
    /// iterator.
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut rect = Rect { min: first, max: first };
        for p in points {
            rect.min.x = rect.min.x.min(p.x);
            rect.min.y = rect.min.y.min(p.y);
            rect.max.x = rect.max.x.max(p.x);
            rect.max.y = rect.max.y.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// True when `(x, y)` lies inside the rect grown by `tolerance` on every
    /// side.
    pub fn contains_xy(&self, x: f64, y: f64, tolerance: f64) -> bool {
        x >= self.min.x - tolerance
            && x <= self.max.x + tolerance
            && y >= self.min.y - tolerance
            && y <= self.max.y + tolerance
    }

    /// True when `other` lies entirely inside this rect grown by `tolerance`.
    pub fn contains_rect(&self, other: &Rect, tolerance: f64) -> bool {
        self.contains_xy(other.min.x, other.min.y, tolerance)
            && self.contains_xy(other.max.x, other.max.y, tolerance)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}
