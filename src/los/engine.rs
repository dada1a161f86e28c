//! Per-shape ray intersection.

use std::f64::consts::{PI, TAU};

use log::warn;

use super::{LineOfSightIntersectionRegion, LineOfSightPoint, Point3, SkimSide};
use crate::geometry::{
    LineSegment, Point, Polygon, PARALLEL_EPSILON, POINT_EPSILON, SKIM_DISTANCE_SQUARED,
};
use crate::shape::HeightMapShape;

/// A region in the clamped ray's local parameter space.
#[derive(Clone, Copy, Debug)]
struct Span {
    t1: f64,
    t2: f64,
    skimmed: bool,
    side: SkimSide,
}

/// The query ray clamped to a shape's vertical slab.
struct ClampedRay {
    a: Point3,
    b: Point3,
    t_start: f64,
    t_end: f64,
    /// The ray is flat and lies exactly on the shape's top or bottom plane.
    flat_face: bool,
}

/// One ray/edge crossing, tagged with the edge it hit.
#[derive(Clone, Copy, Debug)]
struct Hit {
    t: f64,
    u: f64,
    point: Point,
    ring: usize,
    edge: usize,
}

/// Where along an edge the query start point lies.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Zone {
    Start,
    Mid,
    End,
}

/// Computes the ordered intersection regions of the ray `p1 → p2` with one
/// shape. Returns an empty list when the ray never meets the shape.
pub(crate) fn shape_line_of_sight(
    shape: &HeightMapShape,
    uses_height: bool,
    p1: Point3,
    p2: Point3,
) -> Vec<LineOfSightIntersectionRegion> {
    let Some(clamped) = clamp_to_slab(shape, uses_height, p1, p2) else {
        return Vec::new();
    };
    let (a, b) = (clamped.a, clamped.b);
    let ray = LineSegment::new(Point::new(a.x, a.y), Point::new(b.x, b.y));
    let rings: Vec<&Polygon> =
        std::iter::once(&shape.polygon).chain(shape.holes.iter()).collect();

    // a vertical ray has no planar extent: containment alone decides
    if ray.length() < f64::EPSILON {
        if !point_inside(&rings, a.x, a.y) {
            return Vec::new();
        }
        let span = Span { t1: 0.0, t2: 1.0, skimmed: false, side: SkimSide::None };
        return vec![materialize(span, &clamped)];
    }

    let eps_t = POINT_EPSILON / ray.length();
    let hits = collect_hits(&ray, &rings, eps_t);
    let mut spans = traverse(&ray, &rings, &hits, eps_t, start_inside(&ray, &rings, a));

    if clamped.flat_face {
        for span in &mut spans {
            span.skimmed = true;
            span.side = SkimSide::TopBottom;
        }
    }

    for (s1, s2, side) in merged_skims(&ray, &rings, eps_t) {
        spans = splice_skim(spans, s1, s2, side, eps_t);
    }

    spans.into_iter().map(|span| materialize(span, &clamped)).collect()
}

/// Applies the height gate, clamping the ray's endpoints onto the shape's
/// `[bottom, top]` slab. `None` skips the shape entirely.
fn clamp_to_slab(
    shape: &HeightMapShape,
    uses_height: bool,
    p1: Point3,
    p2: Point3,
) -> Option<ClampedRay> {
    if !uses_height {
        return Some(ClampedRay { a: p1, b: p2, t_start: 0.0, t_end: 1.0, flat_face: false });
    }
    let top = shape.top();
    let bottom = shape.elevation;
    if (p1.h > top && p2.h > top) || (p1.h < bottom && p2.h < bottom) {
        return None;
    }
    if p1.h == p2.h {
        let flat_face = p1.h == top || p1.h == bottom;
        return Some(ClampedRay { a: p1, b: p2, t_start: 0.0, t_end: 1.0, flat_face });
    }

    let dh = p2.h - p1.h;
    let (lo, hi) = if dh > 0.0 {
        ((bottom - p1.h) / dh, (top - p1.h) / dh)
    } else {
        ((top - p1.h) / dh, (bottom - p1.h) / dh)
    };
    let lo = lo.max(0.0);
    let hi = hi.min(1.0);
    if hi <= lo {
        return None;
    }
    Some(ClampedRay {
        a: p1.lerp(&p2, lo),
        b: p1.lerp(&p2, hi),
        t_start: lo,
        t_end: hi,
        flat_face: false,
    })
}

/// Collects every crossing of the ray with the shape's rings.
///
/// Crossings at the very start of the ray are discarded (the start state
/// already accounts for them). A crossing landing on an edge endpoint whose
/// neighboring edge runs parallel to the ray gains a synthetic twin on that
/// neighbor, so vertex-collinear cases always arrive as two-edge groups.
fn collect_hits(ray: &LineSegment, rings: &[&Polygon], eps_t: f64) -> Vec<Hit> {
    let mut hits = Vec::new();
    for (ring_index, ring) in rings.iter().enumerate() {
        for (edge_index, edge) in ring.edges().iter().enumerate() {
            let Some(crossing) = ray.intersects_at(edge) else {
                continue;
            };
            if crossing.t < eps_t {
                continue;
            }
            let point = Point::new(crossing.x, crossing.y);
            hits.push(Hit {
                t: crossing.t,
                u: crossing.u,
                point,
                ring: ring_index,
                edge: edge_index,
            });
            let eps_u = POINT_EPSILON / edge.length();
            if crossing.u < eps_u {
                let (previous_index, previous) = ring.previous_edge(edge_index);
                if previous.is_parallel_to(ray) {
                    hits.push(Hit {
                        t: crossing.t,
                        u: 1.0,
                        point,
                        ring: ring_index,
                        edge: previous_index,
                    });
                }
            } else if crossing.u > 1.0 - eps_u {
                let (next_index, next) = ring.next_edge(edge_index);
                if next.is_parallel_to(ray) {
                    hits.push(Hit {
                        t: crossing.t,
                        u: 0.0,
                        point,
                        ring: ring_index,
                        edge: next_index,
                    });
                }
            }
        }
    }
    hits.sort_by(|x, y| x.t.total_cmp(&y.t));
    hits
}

/// Decides whether the ray's start point lies inside the shape.
fn start_inside(ray: &LineSegment, rings: &[&Polygon], a: Point3) -> bool {
    let mut on_edges: Vec<(usize, usize, Zone)> = Vec::new();
    for (ring_index, ring) in rings.iter().enumerate() {
        for (edge_index, edge) in ring.edges().iter().enumerate() {
            let closest = edge.find_closest_point_on_line_to(a.x, a.y);
            let tolerance = POINT_EPSILON / edge.length();
            if closest.distance_squared <= POINT_EPSILON * POINT_EPSILON
                && closest.t >= -tolerance
                && closest.t <= 1.0 + tolerance
            {
                let zone = if closest.t <= tolerance {
                    Zone::Start
                } else if closest.t >= 1.0 - tolerance {
                    Zone::End
                } else {
                    Zone::Mid
                };
                on_edges.push((ring_index, edge_index, zone));
            }
        }
    }

    match on_edges.as_slice() {
        [] => point_inside(rings, a.x, a.y),
        [(ring_index, edge_index, zone)] => {
            let ring = rings[*ring_index];
            let edge = &ring.edges()[*edge_index];
            match zone {
                // the interior of a clockwise ring (and the exterior of a
                // counter-clockwise hole ring) lies on the positive side
                Zone::Mid => edge.dx() * ray.dy() - edge.dy() * ray.dx() > 0.0,
                Zone::Start => {
                    let (_, previous) = ring.previous_edge(*edge_index);
                    direction_from(edge.p1(), ray, false).is_between(previous, edge)
                }
                Zone::End => {
                    let (_, next) = ring.next_edge(*edge_index);
                    direction_from(edge.p2(), ray, false).is_between(edge, next)
                }
            }
        }
        [first, second] => {
            let (incoming, outgoing) = order_vertex_edges(rings, *first, *second);
            let vertex = incoming.p2();
            direction_from(vertex, ray, false).is_between(incoming, outgoing)
        }
        four @ [_, _, _, _] => {
            // square-grid corner kiss: inside when the ray heads into any of
            // the wedges meeting at the vertex
            four.iter().any(|&(ring_index, edge_index, zone)| {
                if zone != Zone::End {
                    return false;
                }
                let ring = rings[ring_index];
                let edge = &ring.edges()[edge_index];
                let (_, next) = ring.next_edge(edge_index);
                direction_from(edge.p2(), ray, false).is_between(edge, next)
            })
        }
        many => {
            warn!(
                "line of sight start lies on {} edges, treating it as outside",
                many.len()
            );
            false
        }
    }
}

/// Walks the `t`-ordered hit groups, flipping insidedness and emitting travel
/// spans.
fn traverse(
    ray: &LineSegment,
    rings: &[&Polygon],
    hits: &[Hit],
    eps_t: f64,
    mut inside: bool,
) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open_t = 0.0;
    let mut push = |t1: f64, t2: f64| {
        if t2 - t1 > eps_t {
            spans.push(Span { t1, t2, skimmed: false, side: SkimSide::None });
        }
    };

    let mut i = 0;
    while i < hits.len() {
        let mut j = i + 1;
        while j < hits.len() && hits[j].t - hits[i].t <= eps_t {
            j += 1;
        }
        let group = &hits[i..j];
        let group_t = group[0].t;
        match group.len() {
            1 => {
                if inside {
                    push(open_t, group_t);
                } else {
                    open_t = group_t;
                }
                inside = !inside;
            }
            2 => {
                let (incoming, outgoing) =
                    order_vertex_edges_by_u(rings, &group[0], &group[1]);
                let vertex = group[0].point;
                let forward = direction_from(vertex, ray, false);
                let backward = direction_from(vertex, ray, true);
                let forward_inside = forward.is_between(incoming, outgoing);
                let backward_inside = backward.is_between(incoming, outgoing);
                // equal on both sides means the ray grazes the vertex and
                // stays where it was
                if forward_inside != backward_inside && forward_inside != inside {
                    if inside {
                        push(open_t, group_t);
                    } else {
                        open_t = group_t;
                    }
                    inside = forward_inside;
                }
            }
            // a 4-way corner kiss: the ray leaves through the mirror wedge of
            // the one it entered, no state change
            4 => {}
            n => {
                warn!("unexpected line-of-sight intersection group of {n} edges");
                let probe = ray.lerp((group_t + 2.0 * eps_t).min(1.0));
                let now_inside = point_inside(rings, probe.x, probe.y);
                if now_inside != inside {
                    if inside {
                        push(open_t, group_t);
                    } else {
                        open_t = group_t;
                    }
                    inside = now_inside;
                }
            }
        }
        i = j;
    }
    if inside {
        push(open_t, 1.0);
    }
    spans
}

/// Finds every stretch of the ray that slides along a near-parallel edge
/// within skim distance, merged per side.
fn merged_skims(
    ray: &LineSegment,
    rings: &[&Polygon],
    eps_t: f64,
) -> Vec<(f64, f64, SkimSide)> {
    let mut skims: Vec<(f64, f64, SkimSide)> = Vec::new();
    for ring in rings {
        for edge in ring.edges() {
            let Some(side) = parallel_side(ray.angle(), edge.angle()) else {
                continue;
            };
            let c1 = ray.find_closest_point_on_line_to(edge.p1().x, edge.p1().y);
            let c2 = ray.find_closest_point_on_line_to(edge.p2().x, edge.p2().y);
            if c1.distance_squared > SKIM_DISTANCE_SQUARED
                || c2.distance_squared > SKIM_DISTANCE_SQUARED
            {
                continue;
            }
            let lo = c1.t.min(c2.t).clamp(0.0, 1.0);
            let hi = c1.t.max(c2.t).clamp(0.0, 1.0);
            if hi - lo > eps_t {
                skims.push((lo, hi, side));
            }
        }
    }
    skims.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut merged: Vec<(f64, f64, SkimSide)> = Vec::new();
    for skim in skims {
        match merged.last_mut() {
            Some(last) if last.2 == skim.2 && skim.0 <= last.1 + eps_t => {
                last.1 = last.1.max(skim.1);
            }
            _ => merged.push(skim),
        }
    }
    merged
}

/// An edge within skim tolerance of the ray: `Right` when it runs parallel,
/// `Left` when antiparallel.
fn parallel_side(ray_angle: f64, edge_angle: f64) -> Option<SkimSide> {
    let mut difference = (edge_angle - ray_angle).abs() % TAU;
    if difference > PI {
        difference = TAU - difference;
    }
    if difference <= PARALLEL_EPSILON {
        Some(SkimSide::Right)
    } else if PI - difference <= PARALLEL_EPSILON {
        Some(SkimSide::Left)
    } else {
        None
    }
}

/// Re-labels the stretch of each travel span that overlaps the skim
/// `[s1, s2]`, leaving the non-overlapping remainders intact.
fn splice_skim(
    spans: Vec<Span>,
    s1: f64,
    s2: f64,
    side: SkimSide,
    eps_t: f64,
) -> Vec<Span> {
    let mut next = Vec::with_capacity(spans.len());
    for span in spans {
        if span.skimmed || span.t2 <= s1 + eps_t || span.t1 >= s2 - eps_t {
            next.push(span);
            continue;
        }
        let o1 = span.t1.max(s1);
        let o2 = span.t2.min(s2);
        if o1 - span.t1 > eps_t {
            next.push(Span { t2: o1, ..span });
        }
        next.push(Span { t1: o1, t2: o2, skimmed: true, side });
        if span.t2 - o2 > eps_t {
            next.push(Span { t1: o2, ..span });
        }
    }
    next
}

fn materialize(span: Span, clamped: &ClampedRay) -> LineOfSightIntersectionRegion {
    let at = |local_t: f64| {
        let p = clamped.a.lerp(&clamped.b, local_t);
        LineOfSightPoint {
            x: p.x,
            y: p.y,
            h: p.h,
            t: clamped.t_start + local_t * (clamped.t_end - clamped.t_start),
        }
    };
    LineOfSightIntersectionRegion {
        start: at(span.t1),
        end: at(span.t2),
        skimmed: span.skimmed,
        skim_side: span.side,
    }
}

/// Point-in-shape test: inside the outer ring and outside every hole.
fn point_inside(rings: &[&Polygon], x: f64, y: f64) -> bool {
    rings[0].contains_point(x, y, false)
        && rings[1..].iter().all(|hole| !hole.contains_point(x, y, false))
}

/// A unit-length probe segment from `origin` along (or against) the ray's
/// direction; only its angle matters.
fn direction_from(origin: Point, ray: &LineSegment, backwards: bool) -> LineSegment {
    let scale = if backwards { -1.0 } else { 1.0 } / ray.length();
    LineSegment::new(
        origin,
        Point::new(origin.x + ray.dx() * scale, origin.y + ray.dy() * scale),
    )
}

/// Orders two edges meeting at a vertex as (incoming, outgoing) using the
/// start point's zone on each.
fn order_vertex_edges<'r>(
    rings: &[&'r Polygon],
    first: (usize, usize, Zone),
    second: (usize, usize, Zone),
) -> (&'r LineSegment, &'r LineSegment) {
    let edge = |(ring, index, _): (usize, usize, Zone)| &rings[ring].edges()[index];
    if second.2 == Zone::End || first.2 == Zone::Start {
        (edge(second), edge(first))
    } else {
        (edge(first), edge(second))
    }
}

/// Orders two hit edges at a shared vertex as (incoming, outgoing) using the
/// edge parameter of each hit.
fn order_vertex_edges_by_u<'r>(
    rings: &[&'r Polygon],
    first: &Hit,
    second: &Hit,
) -> (&'r LineSegment, &'r LineSegment) {
    let edge = |hit: &Hit| &rings[hit.ring].edges()[hit.edge];
    if first.u >= 0.5 {
        (edge(first), edge(second))
    } else {
        (edge(second), edge(first))
    }
}
