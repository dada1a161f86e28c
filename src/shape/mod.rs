//! Merged 2.5D terrain shapes derived from the cell map.

mod builder;

pub(crate) use builder::build_shapes;

use std::collections::BTreeSet;

use crate::geometry::Polygon;
use crate::heightmap::Cell;

/// One merged solid: a maximal connected run of cells sharing the same
/// `(terrain type, height, elevation)`, as a clockwise outer polygon plus
/// zero or more counter-clockwise holes.
///
/// Shapes are derived values: the store rebuilds the full list after every
/// successful edit and they are never mutated in place.
#[derive(Clone, Debug)]
pub struct HeightMapShape {
    pub terrain_type_id: String,
    pub polygon: Polygon,
    pub holes: Vec<Polygon>,
    pub elevation: f64,
    pub height: f64,
    /// Every cell whose footprint contributed to this shape, including
    /// interior cells all of whose edges cancelled.
    pub cells: BTreeSet<Cell>,
}

impl HeightMapShape {
    /// Top of the shape's vertical slab.
    pub fn top(&self) -> f64 {
        self.elevation + self.height
    }
}
