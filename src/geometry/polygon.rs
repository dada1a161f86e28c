use super::{LineSegment, Point, Rect, POINT_EPSILON};

/// A closed polygon over an ordered vertex ring.
///
/// Vertices are stored without a repeated closing point; `edges()[i]` runs
/// from `vertices()[i]` to `vertices()[(i + 1) % n]`. The bounding box and
/// the vertex-mean centroid are computed at construction. Convexity is not
/// assumed anywhere.
///
/// A polygon is "clockwise" when its first edge's
/// [`clockwise`](LineSegment::clockwise) flag is true; grid shapes use
/// clockwise rings for solids and counter-clockwise rings for holes.
#[derive(Clone, Debug)]
pub struct Polygon {
    vertices: Vec<Point>,
    edges: Vec<LineSegment>,
    bounding_box: Rect,
    centroid: Point,
}

impl Polygon {
    /// Builds a polygon from an open vertex ring (at least 3 vertices).
    pub fn new(vertices: Vec<Point>) -> Self {
        debug_assert!(vertices.len() >= 3, "polygon needs at least 3 vertices");
        let edges = vertices
            .iter()
            .enumerate()
            .map(|(i, &p)| LineSegment::new(p, vertices[(i + 1) % vertices.len()]))
            .collect();
        let bounding_box =
            Rect::from_points(vertices.iter().copied()).expect("non-empty vertex ring");
        let n = vertices.len() as f64;
        let centroid = Point::new(
            vertices.iter().map(|p| p.x).sum::<f64>() / n,
            vertices.iter().map(|p| p.y).sum::<f64>() / n,
        );
        Polygon { vertices, edges, bounding_box, centroid }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn edges(&self) -> &[LineSegment] {
        &self.edges
    }

    pub fn bounding_box(&self) -> &Rect {
        &self.bounding_box
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    pub fn is_clockwise(&self) -> bool {
        self.edges[0].clockwise()
    }

    /// The edge before `index`, wrapping around the ring.
    pub fn previous_edge(&self, index: usize) -> (usize, &LineSegment) {
        let i = (index + self.edges.len() - 1) % self.edges.len();
        (i, &self.edges[i])
    }

    /// The edge after `index`, wrapping around the ring.
    pub fn next_edge(&self, index: usize) -> (usize, &LineSegment) {
        let i = (index + 1) % self.edges.len();
        (i, &self.edges[i])
    }

    /// Iterates the remaining edges of the ring starting after `start`,
    /// forwards or backwards.
    pub fn traverse_edges(
        &self,
        start: usize,
        forwards: bool,
    ) -> impl Iterator<Item = (usize, &LineSegment)> + '_ {
        let n = self.edges.len();
        (1..n).map(move |step| {
            let i = if forwards {
                (start + step) % n
            } else {
                (start + n - step) % n
            };
            (i, &self.edges[i])
        })
    }

    /// Even-odd point containment with explicit edge handling.
    ///
    /// Points within a pixel of any edge return `contains_on_edge`. Interior
    /// testing casts a horizontal ray leftwards from the query point and
    /// counts boundary crossings; vertices and horizontal edges lying exactly
    /// on the ray need the two extra rules below to keep the parity honest:
    ///
    /// 1. crossings are deduplicated by `(x, sign of edge dy)`, so a vertex
    ///    the ring passes straight through counts once while a vertex it
    ///    touches and leaves again counts twice;
    /// 2. a horizontal run lying exactly on the ray counts once when the
    ///    non-horizontal edges on either side of the run approach from the
    ///    same vertical side, and evenly otherwise.
    pub fn contains_point(&self, x: f64, y: f64, contains_on_edge: bool) -> bool {
        if !self.bounding_box.contains_xy(x, y, POINT_EPSILON) {
            return false;
        }

        for edge in &self.edges {
            let closest = edge.find_closest_point_on_line_to(x, y);
            let t_tolerance = POINT_EPSILON / edge.length();
            if closest.distance_squared <= POINT_EPSILON * POINT_EPSILON
                && closest.t >= -t_tolerance
                && closest.t <= 1.0 + t_tolerance
            {
                return contains_on_edge;
            }
        }

        let mut crossings: Vec<(f64, i8)> = Vec::new();
        for edge in &self.edges {
            let (y1, y2) = (edge.p1().y, edge.p2().y);
            if y1 == y && y2 == y {
                continue; // horizontal run on the ray, handled below
            }
            if (y1 < y && y2 < y) || (y1 > y && y2 > y) {
                continue;
            }
            let x_int = edge.p1().x + (y - y1) / (y2 - y1) * edge.dx();
            if x_int >= x {
                continue;
            }
            let sign = if y2 > y1 { 1 } else { -1 };
            if !crossings
                .iter()
                .any(|&(cx, cs)| cs == sign && (cx - x_int).abs() <= POINT_EPSILON)
            {
                crossings.push((x_int, sign));
            }
        }

        let mut count = crossings.len();
        count += self.horizontal_run_crossings(x, y);
        count % 2 == 1
    }

    /// Counts the parity contribution of horizontal edge runs lying exactly
    /// on the scan line at `y`, left of `x`.
    ///
    /// The neighboring non-horizontal edges of such a run each register a
    /// crossing of their own at the run's endpoints; when they approach from
    /// the same side the pair must collapse to a single crossing, which this
    /// models by adding one (parity-equivalent to removing one).
    fn horizontal_run_crossings(&self, x: f64, y: f64) -> usize {
        let n = self.edges.len();
        let on_ray = |e: &LineSegment| e.p1().y == y && e.p2().y == y;
        let mut extra = 0;
        let mut i = 0;
        while i < n {
            if !on_ray(&self.edges[i]) {
                i += 1;
                continue;
            }
            // skip runs continued from the wrap-around, they are scanned once
            // starting from their first edge
            if i == 0 && on_ray(&self.edges[n - 1]) {
                i += 1;
                continue;
            }
            if i > 0 && on_ray(&self.edges[i - 1]) {
                i += 1;
                continue;
            }
            // expand the run forwards
            let mut last = i;
            while on_ray(&self.edges[(last + 1) % n]) && (last + 1 - i) < n {
                last += 1;
            }
            let run_left_of_ray = (i..=last).all(|k| {
                let e = &self.edges[k % n];
                e.p1().x < x && e.p2().x < x
            });
            if run_left_of_ray {
                let (_, before) = self.previous_edge(i % n);
                let (_, after) = self.next_edge(last % n);
                let before_sign = before.dy() > 0.0;
                let after_sign = after.dy() > 0.0;
                if before_sign == after_sign {
                    extra += 1;
                }
            }
            i = last + 1;
        }
        extra
    }

    /// Whether `other` lies inside this polygon.
    ///
    /// Grid-derived polygons never cross each other, so a single interior
    /// probe decides containment: the topmost vertex of `other`, displaced
    /// half a pixel downwards to dodge vertex-on-vertex collisions.
    pub fn contains_polygon(&self, other: &Polygon) -> bool {
        if !self
            .bounding_box
            .contains_rect(other.bounding_box(), POINT_EPSILON)
        {
            return false;
        }
        let topmost = other
            .vertices
            .iter()
            .min_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
            .expect("non-empty vertex ring");
        self.contains_point(topmost.x, topmost.y + POINT_EPSILON / 2.0, true)
    }
}
