//! Merges per-shape intersection regions into one ordered timeline.

use super::{
    FlattenedLineOfSightRegion, LineOfSightIntersectionRegion, LineOfSightPoint, ShapeLineOfSight,
    SkimSide,
};

/// Tolerance for treating two ray parameters as the same boundary.
const T_EPSILON: f64 = 1e-9;

/// Flattens per-shape regions into contiguous stretches of the ray, each
/// listing every shape the ray is inside there.
///
/// A flattened stretch counts as a skim only when every overlapping region
/// is a skim and they agree on a side: a left skim and a right skim at the
/// same `t` mean the ray is squeezing between two shapes' faces, which
/// reports as a true intersection.
pub fn flatten_line_of_sight(
    results: &[ShapeLineOfSight],
) -> Vec<FlattenedLineOfSightRegion> {
    let mut boundaries: Vec<f64> = results
        .iter()
        .flat_map(|shape| shape.regions.iter().flat_map(|r| [r.start.t, r.end.t]))
        .collect();
    boundaries.sort_by(f64::total_cmp);
    boundaries.dedup_by(|a, b| (*a - *b).abs() <= T_EPSILON);

    let mut flattened = Vec::new();
    for window in boundaries.windows(2) {
        let (from, to) = (window[0], window[1]);
        let mut shapes: Vec<usize> = Vec::new();
        let mut all_skims = true;
        let mut left = false;
        let mut right = false;
        let mut sample: Option<&LineOfSightIntersectionRegion> = None;

        for result in results {
            for region in &result.regions {
                if region.start.t < to && region.end.t >= to {
                    shapes.push(result.shape);
                    sample.get_or_insert(region);
                    if region.skimmed {
                        match region.skim_side {
                            SkimSide::Left => left = true,
                            SkimSide::Right => right = true,
                            _ => {}
                        }
                    } else {
                        all_skims = false;
                    }
                }
            }
        }

        let Some(sample) = sample else {
            continue;
        };
        shapes.sort_unstable();
        shapes.dedup();
        flattened.push(FlattenedLineOfSightRegion {
            start: region_point_at(sample, from),
            end: region_point_at(sample, to),
            shapes,
            skimmed: all_skims && !(left && right),
        });
    }
    flattened
}

/// Interpolates a position at ray parameter `t` within a region's travel.
fn region_point_at(region: &LineOfSightIntersectionRegion, t: f64) -> LineOfSightPoint {
    let span = region.end.t - region.start.t;
    let f = if span > 0.0 {
        ((t - region.start.t) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    LineOfSightPoint {
        x: region.start.x + (region.end.x - region.start.x) * f,
        y: region.start.y + (region.end.y - region.start.y) * f,
        h: region.start.h + (region.end.h - region.start.h) * f,
        t,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn point(t: f64) -> LineOfSightPoint {
        LineOfSightPoint { x: t * 100.0, y: 0.0, h: 1.0, t }
    }

    fn region(t1: f64, t2: f64, skimmed: bool, side: SkimSide) -> LineOfSightIntersectionRegion {
        LineOfSightIntersectionRegion {
            start: point(t1),
            end: point(t2),
            skimmed,
            skim_side: side,
        }
    }

    fn shape(index: usize, regions: Vec<LineOfSightIntersectionRegion>) -> ShapeLineOfSight {
        ShapeLineOfSight { shape: index, regions }
    }

    #[test]
    fn empty_input_flattens_to_nothing() {
        assert!(flatten_line_of_sight(&[]).is_empty());
    }

    #[test]
    fn overlapping_regions_union_their_shapes() {
        let results = vec![
            shape(0, vec![region(0.2, 0.6, false, SkimSide::None)]),
            shape(1, vec![region(0.4, 0.8, false, SkimSide::None)]),
        ];
        let flat = flatten_line_of_sight(&results);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].shapes, vec![0]);
        assert_eq!(flat[1].shapes, vec![0, 1]);
        assert_eq!(flat[2].shapes, vec![1]);
        assert!((flat[1].start.t - 0.4).abs() < 1e-12);
        assert!((flat[1].end.t - 0.6).abs() < 1e-12);
        assert!(flat.iter().all(|r| !r.skimmed));
    }

    #[test]
    fn adjacent_regions_share_a_boundary_without_gaps() {
        let results = vec![
            shape(0, vec![region(0.0, 0.5, false, SkimSide::None)]),
            shape(1, vec![region(0.5, 1.0, false, SkimSide::None)]),
        ];
        let flat = flatten_line_of_sight(&results);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].shapes, vec![0]);
        assert_eq!(flat[1].shapes, vec![1]);
        assert_eq!(flat[0].end.t, flat[1].start.t);
    }

    #[test]
    fn all_skims_on_one_side_stay_a_skim() {
        let results = vec![
            shape(0, vec![region(0.2, 0.8, true, SkimSide::Right)]),
            shape(1, vec![region(0.3, 0.7, true, SkimSide::Right)]),
        ];
        let flat = flatten_line_of_sight(&results);
        assert!(flat.iter().all(|r| r.skimmed));
    }

    #[test]
    fn opposite_side_skims_become_a_real_intersection() {
        // squeezing between two faces: left skim on one shape, right on the
        // other
        let results = vec![
            shape(0, vec![region(0.2, 0.8, true, SkimSide::Right)]),
            shape(1, vec![region(0.2, 0.8, true, SkimSide::Left)]),
        ];
        let flat = flatten_line_of_sight(&results);
        assert_eq!(flat.len(), 1);
        assert!(!flat[0].skimmed);
        assert_eq!(flat[0].shapes, vec![0, 1]);
    }

    #[test]
    fn skim_mixed_with_travel_is_not_a_skim() {
        let results = vec![
            shape(0, vec![region(0.0, 1.0, false, SkimSide::None)]),
            shape(1, vec![region(0.4, 0.6, true, SkimSide::TopBottom)]),
        ];
        let flat = flatten_line_of_sight(&results);
        assert!(flat.iter().all(|r| !r.skimmed));
    }

    #[test]
    fn gap_between_regions_emits_nothing() {
        let results = vec![shape(
            0,
            vec![
                region(0.0, 0.3, false, SkimSide::None),
                region(0.7, 1.0, false, SkimSide::None),
            ],
        )];
        let flat = flatten_line_of_sight(&results);
        assert_eq!(flat.len(), 2);
        assert!((flat[0].end.t - 0.3).abs() < 1e-12);
        assert!((flat[1].start.t - 0.7).abs() < 1e-12);
    }
}
