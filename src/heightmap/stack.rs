use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One vertical slab of a terrain type occupying a cell.
///
/// For terrain types without height, both `elevation` and `height` are
/// stored as zero and ignored at query time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainLayer {
    pub terrain_type_id: String,
    #[serde(default)]
    pub elevation: f64,
    pub height: f64,
}

impl TerrainLayer {
    pub fn new(terrain_type_id: impl Into<String>, elevation: f64, height: f64) -> Self {
        TerrainLayer {
            terrain_type_id: terrain_type_id.into(),
            elevation,
            height,
        }
    }

    /// Top of the slab: `elevation + height`.
    pub fn top(&self) -> f64 {
        self.elevation + self.height
    }

    /// Whether this stored layer occupies a vertical range.
    pub fn uses_height(&self) -> bool {
        self.height > 0.0
    }
}

/// The ordered layers of one cell. Most painted cells carry one or two
/// layers, so they live inline.
pub type LayerStack = SmallVec<[TerrainLayer; 2]>;

/// Keeps a stack in its canonical order: ascending elevation, ties broken by
/// terrain type id.
pub(crate) fn normalize(stack: &mut LayerStack) {
    stack.sort_by(|a, b| {
        a.elevation
            .total_cmp(&b.elevation)
            .then_with(|| a.terrain_type_id.cmp(&b.terrain_type_id))
    });
}

/// Clips the vertical range `[bottom, top]` out of every layer accepted by
/// `filter`.
///
/// A layer fully inside the range is removed; a layer enclosing it is split
/// in two; a layer overlapping one end is truncated. Iteration runs from the
/// top of the stack down so splice indexes stay valid. Returns whether
/// anything changed.
pub(crate) fn clip_between(
    stack: &mut LayerStack,
    bottom: f64,
    top: f64,
    filter: impl Fn(&TerrainLayer) -> bool,
) -> bool {
    let mut changed = false;
    for i in (0..stack.len()).rev() {
        if !filter(&stack[i]) {
            continue;
        }
        let layer_bottom = stack[i].elevation;
        let layer_top = stack[i].top();
        if layer_bottom >= bottom && layer_top <= top {
            stack.remove(i);
            changed = true;
        } else if bottom > layer_bottom && top < layer_top {
            let upper = TerrainLayer::new(stack[i].terrain_type_id.clone(), top, layer_top - top);
            stack[i].height = bottom - layer_bottom;
            stack.insert(i + 1, upper);
            changed = true;
        } else if top > layer_bottom && top < layer_top {
            stack[i].elevation = top;
            stack[i].height = layer_top - top;
            changed = true;
        } else if bottom > layer_bottom && bottom < layer_top {
            stack[i].height = bottom - layer_bottom;
            changed = true;
        }
    }
    changed
}

/// Merges a new `[elevation, elevation + height]` slab of `terrain_type_id`
/// into the stack.
///
/// Every same-type layer that overlaps or touches the new range is absorbed
/// into one contiguous layer spanning the union. Inserting a range an
/// existing layer already covers is a no-op and reports no change.
pub(crate) fn merge_same_type(
    stack: &mut LayerStack,
    terrain_type_id: &str,
    elevation: f64,
    height: f64,
) -> bool {
    let mut bottom = elevation;
    let mut top = elevation + height;

    if stack.iter().any(|l| {
        l.terrain_type_id == terrain_type_id && l.elevation <= bottom && l.top() >= top
    }) {
        return false;
    }

    for i in (0..stack.len()).rev() {
        let layer = &stack[i];
        if layer.terrain_type_id != terrain_type_id {
            continue;
        }
        if layer.top() >= bottom && layer.elevation <= top {
            bottom = bottom.min(layer.elevation);
            top = top.max(layer.top());
            stack.remove(i);
        }
    }
    stack.push(TerrainLayer::new(terrain_type_id, bottom, top - bottom));
    true
}

/// Subtracts `blockers` from `range`, returning the surviving sub-ranges in
/// ascending order.
pub(crate) fn subtract_intervals(range: (f64, f64), blockers: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut blockers: Vec<(f64, f64)> = blockers
        .iter()
        .copied()
        .filter(|&(lo, hi)| hi > range.0 && lo < range.1)
        .collect();
    blockers.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut spans = Vec::new();
    let mut cursor = range.0;
    for (lo, hi) in blockers {
        if lo > cursor {
            spans.push((cursor, lo));
        }
        cursor = cursor.max(hi);
        if cursor >= range.1 {
            break;
        }
    }
    if cursor < range.1 {
        spans.push((cursor, range.1));
    }
    spans
}

#[cfg(test)]
mod test {
    use super::*;
    use smallvec::smallvec;

    fn layer(id: &str, elevation: f64, height: f64) -> TerrainLayer {
        TerrainLayer::new(id, elevation, height)
    }

    #[test]
    fn clip_removes_enclosed_layers() {
        let mut stack: LayerStack = smallvec![layer("a", 1.0, 2.0)];
        assert!(clip_between(&mut stack, 0.0, 4.0, |_| true));
        assert!(stack.is_empty());
    }

    #[test]
    fn clip_splits_enclosing_layers() {
        let mut stack: LayerStack = smallvec![layer("a", 0.0, 10.0)];
        assert!(clip_between(&mut stack, 3.0, 7.0, |_| true));
        assert_eq!(
            stack.to_vec(),
            vec![layer("a", 0.0, 3.0), layer("a", 7.0, 3.0)]
        );
    }

    #[test]
    fn clip_truncates_overlapping_ends() {
        // range overlaps the layer's bottom: its floor is raised
        let mut stack: LayerStack = smallvec![layer("a", 2.0, 4.0)];
        assert!(clip_between(&mut stack, 0.0, 3.0, |_| true));
        assert_eq!(stack.to_vec(), vec![layer("a", 3.0, 3.0)]);

        // range overlaps the layer's top: its ceiling is lowered
        let mut stack: LayerStack = smallvec![layer("a", 2.0, 4.0)];
        assert!(clip_between(&mut stack, 5.0, 8.0, |_| true));
        assert_eq!(stack.to_vec(), vec![layer("a", 2.0, 3.0)]);
    }

    #[test]
    fn clip_skips_touching_and_filtered_layers() {
        let mut stack: LayerStack = smallvec![layer("a", 2.0, 2.0), layer("b", 0.0, 2.0)];
        // [0, 2] touches a's bottom without overlapping it
        assert!(clip_between(&mut stack, 0.0, 2.0, |l| l.terrain_type_id == "a"));
        assert_eq!(stack.to_vec(), vec![layer("a", 2.0, 2.0), layer("b", 0.0, 2.0)]);
    }

    #[test]
    fn merge_unions_touching_layers() {
        let mut stack: LayerStack = smallvec![layer("a", 0.0, 1.0), layer("a", 3.0, 1.0)];
        assert!(merge_same_type(&mut stack, "a", 1.0, 2.0));
        normalize(&mut stack);
        assert_eq!(stack.to_vec(), vec![layer("a", 0.0, 4.0)]);
    }

    #[test]
    fn merge_into_covering_layer_reports_no_change() {
        let mut stack: LayerStack = smallvec![layer("a", 0.0, 5.0)];
        assert!(!merge_same_type(&mut stack, "a", 1.0, 2.0));
        assert_eq!(stack.to_vec(), vec![layer("a", 0.0, 5.0)]);
    }

    #[test]
    fn merge_leaves_other_types_alone() {
        let mut stack: LayerStack = smallvec![layer("b", 0.0, 5.0)];
        assert!(merge_same_type(&mut stack, "a", 1.0, 2.0));
        normalize(&mut stack);
        assert_eq!(stack.to_vec(), vec![layer("b", 0.0, 5.0), layer("a", 1.0, 2.0)]);
    }

    #[test]
    fn interval_subtraction() {
        assert_eq!(
            subtract_intervals((0.0, 10.0), &[(2.0, 3.0), (5.0, 7.0)]),
            vec![(0.0, 2.0), (3.0, 5.0), (7.0, 10.0)]
        );
        // blocker swallowing the whole range
        assert!(subtract_intervals((2.0, 4.0), &[(0.0, 10.0)]).is_empty());
        // blockers outside the range are ignored
        assert_eq!(
            subtract_intervals((0.0, 2.0), &[(3.0, 4.0)]),
            vec![(0.0, 2.0)]
        );
        // overlapping blockers collapse
        assert_eq!(
            subtract_intervals((0.0, 10.0), &[(1.0, 6.0), (4.0, 8.0)]),
            vec![(0.0, 1.0), (8.0, 10.0)]
        );
    }
}
