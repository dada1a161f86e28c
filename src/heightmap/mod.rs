//! The height map store and its editing facade.

mod cell;
mod persist;
mod stack;
mod store;

pub use cell::{Cell, ParseCellError};
pub use stack::{LayerStack, TerrainLayer};
pub use store::{HeightMapData, UNDO_HISTORY_LIMIT};

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use smallvec::smallvec;

use crate::error::Error;
use crate::grid::GridAdapter;
use crate::los::{self, FlattenedLineOfSightRegion, LineOfSightOptions, Point3, ShapeLineOfSight};
use crate::shape::{self, HeightMapShape};
use crate::terrain::TerrainTypeRegistry;
use store::{UndoEntry, UndoHistory};

/// How painting resolves against layers already present in a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaintMode {
    /// Replace the cell's entire stack with the painted layer.
    TotalReplace,
    /// Carve the painted range out of other height-using terrain, then weld
    /// with same-type layers.
    DestructiveMerge,
    /// Let existing other-type terrain clip the painted layer, then weld the
    /// surviving ranges with same-type layers.
    AdditiveMerge,
}

/// How a flood fill decides that a neighboring cell matches the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FillBoundary {
    /// Compare only the slice of each stack within the painted vertical
    /// range; non-height terrain still compares strictly.
    ApplicableBoundary,
    /// Compare whole stacks, order-insensitively.
    StrictBoundary,
}

/// Filters for [`HeightMap::erase_cells`].
#[derive(Clone, Debug)]
pub struct EraseOptions {
    /// When set, only these terrain types are erased.
    pub only: Option<Vec<String>>,
    /// These terrain types are never erased.
    pub excluding: Vec<String>,
    /// Lower bound of the erased vertical range.
    pub bottom: f64,
    /// Upper bound of the erased vertical range.
    pub top: f64,
}

impl Default for EraseOptions {
    fn default() -> Self {
        EraseOptions {
            only: None,
            excluding: Vec::new(),
            bottom: f64::NEG_INFINITY,
            top: f64::INFINITY,
        }
    }
}

impl EraseOptions {
    fn passes(&self, layer: &TerrainLayer) -> bool {
        let id = layer.terrain_type_id.as_str();
        self.only
            .as_ref()
            .map_or(true, |only| only.iter().any(|t| t == id))
            && !self.excluding.iter().any(|t| t == id)
    }
}

/// The terrain height core.
///
/// Owns the cell data, the derived shape list and the undo history, and
/// consults the host-supplied grid adapter and terrain registry. Every
/// mutation validates first, applies fully, then rebuilds the shape list
/// before returning, so `current_shapes` always reflects the latest edit.
#[derive(Clone, Debug)]
pub struct HeightMap<G, R> {
    grid: G,
    terrain_types: R,
    data: HeightMapData,
    shapes: Vec<HeightMapShape>,
    history: UndoHistory,
}

impl<G: GridAdapter, R: TerrainTypeRegistry> HeightMap<G, R> {
    /// An empty height map over the given grid and terrain palette.
    pub fn new(grid: G, terrain_types: R) -> Self {
        HeightMap {
            grid,
            terrain_types,
            data: HeightMapData::new(),
            shapes: Vec::new(),
            history: UndoHistory::default(),
        }
    }

    /// A height map over existing cell data, e.g. loaded from disk. Builds
    /// the shape list immediately.
    pub fn with_data(grid: G, terrain_types: R, data: HeightMapData) -> Result<Self, Error> {
        let mut map = HeightMap {
            grid,
            terrain_types,
            data,
            shapes: Vec::new(),
            history: UndoHistory::default(),
        };
        map.recompute_shapes()?;
        Ok(map)
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn terrain_types(&self) -> &R {
        &self.terrain_types
    }

    pub fn data(&self) -> &HeightMapData {
        &self.data
    }

    /// Serializes the current cell data in the on-disk form.
    pub fn save(&self) -> Result<serde_json::Value, serde_json::Error> {
        self.data.to_json(&self.terrain_types)
    }

    /// The layer stack of one cell; empty for unpainted cells.
    pub fn get_cell(&self, row: i32, col: i32) -> &[TerrainLayer] {
        self.data.get(Cell::new(row, col))
    }

    /// All current shapes whose footprint includes the cell.
    pub fn get_shapes(&self, row: i32, col: i32) -> Vec<&HeightMapShape> {
        let cell = Cell::new(row, col);
        self.shapes
            .iter()
            .filter(|shape| shape.cells.contains(&cell))
            .collect()
    }

    /// The full derived shape list, in deterministic build order.
    pub fn current_shapes(&self) -> &[HeightMapShape] {
        &self.shapes
    }

    /// Paints a terrain layer onto each listed cell.
    ///
    /// For height-using terrain, `height` must be positive and `elevation`
    /// non-negative; for other terrain both are coerced to zero. Returns
    /// whether anything changed; a change pushes one undo entry and rebuilds
    /// the shape list.
    pub fn paint_cells(
        &mut self,
        cells: &[Cell],
        terrain_type_id: &str,
        height: f64,
        elevation: f64,
        mode: PaintMode,
    ) -> Result<bool, Error> {
        let (height, elevation) = self.validate_paint(terrain_type_id, height, elevation)?;
        let uses_height = self.uses_height(terrain_type_id);

        let mut undo_entry = UndoEntry::new();
        for &cell in &dedup(cells) {
            let before: LayerStack = self.data.get(cell).iter().cloned().collect();
            let stack = self.data.stack_mut(cell);
            if apply_paint(stack, terrain_type_id, uses_height, elevation, height, mode) {
                stack::normalize(stack);
                undo_entry.insert(cell, before);
            } else {
                self.data.prune(cell);
            }
        }
        self.commit(undo_entry)
    }

    /// Erases terrain from each listed cell, filtered by type and vertical
    /// range.
    ///
    /// Height-using layers intersecting `[bottom, top]` are clipped out
    /// (split, truncated or removed); non-height layers passing the type
    /// filters are removed outright.
    pub fn erase_cells(&mut self, cells: &[Cell], options: &EraseOptions) -> Result<bool, Error> {
        let mut undo_entry = UndoEntry::new();
        for &cell in &dedup(cells) {
            let before: LayerStack = self.data.get(cell).iter().cloned().collect();
            if before.is_empty() {
                continue;
            }
            let stack = self.data.stack_mut(cell);
            let clipped = stack::clip_between(stack, options.bottom, options.top, |layer| {
                layer.uses_height() && options.passes(layer)
            });
            let before_len = stack.len();
            stack.retain(|layer| !(!layer.uses_height() && options.passes(layer)));
            let removed = stack.len() != before_len;
            if clipped || removed {
                undo_entry.insert(cell, before);
            }
            self.data.prune(cell);
        }
        self.commit(undo_entry)
    }

    /// Flood-fills terrain outward from `origin`.
    ///
    /// The flood visits 4-connected cells on square grids and 6-connected
    /// cells on hex grids, expanding through cells whose stack matches the
    /// origin's under `boundary` and pruning cells outside the canvas.
    /// Matching cells are painted with [`PaintMode::DestructiveMerge`]
    /// semantics as one undoable edit.
    pub fn fill_cells(
        &mut self,
        origin: Cell,
        terrain_type_id: &str,
        height: f64,
        elevation: f64,
        boundary: FillBoundary,
    ) -> Result<bool, Error> {
        let (height, elevation) = self.validate_paint(terrain_type_id, height, elevation)?;
        let uses_height = self.uses_height(terrain_type_id);

        if !self.cell_on_canvas(origin) {
            return Ok(false);
        }
        let origin_stack: LayerStack = self.data.get(origin).iter().cloned().collect();

        let mut visited = BTreeSet::from([origin]);
        let mut targets = vec![origin];
        let mut queue = VecDeque::from([origin]);
        while let Some(cell) = queue.pop_front() {
            for (row, col) in self.grid.fill_neighbors(cell.row, cell.col) {
                let next = Cell::new(row, col);
                if !visited.insert(next) || !self.cell_on_canvas(next) {
                    continue;
                }
                let matches = stacks_match(
                    self.data.get(next),
                    &origin_stack,
                    boundary,
                    elevation,
                    elevation + height,
                );
                if matches {
                    targets.push(next);
                    queue.push_back(next);
                }
            }
        }

        let mut undo_entry = UndoEntry::new();
        for cell in targets {
            let before: LayerStack = self.data.get(cell).iter().cloned().collect();
            let stack = self.data.stack_mut(cell);
            let changed = apply_paint(
                stack,
                terrain_type_id,
                uses_height,
                elevation,
                height,
                PaintMode::DestructiveMerge,
            );
            if changed {
                stack::normalize(stack);
                undo_entry.insert(cell, before);
            } else {
                self.data.prune(cell);
            }
        }
        self.commit(undo_entry)
    }

    /// Empties the map. Bypasses the undo history; returns whether anything
    /// was removed.
    pub fn clear(&mut self) -> bool {
        if self.data.is_empty() {
            return false;
        }
        self.data = HeightMapData::new();
        self.shapes.clear();
        true
    }

    /// Reverts the most recent paint, erase or fill. Returns `false` when
    /// the history is empty.
    pub fn undo(&mut self) -> Result<bool, Error> {
        let Some(entry) = self.history.pop() else {
            return Ok(false);
        };
        for (cell, stack) in entry {
            self.data.restore(cell, stack);
        }
        self.recompute_shapes()?;
        Ok(true)
    }

    /// Computes, for every eligible shape, the ordered regions where the ray
    /// `p1 → p2` passes through it. Shapes the ray never meets are omitted.
    pub fn calculate_line_of_sight(
        &self,
        p1: Point3,
        p2: Point3,
        options: &LineOfSightOptions,
    ) -> Vec<ShapeLineOfSight> {
        if p1 == p2 {
            return Vec::new();
        }
        self.shapes
            .iter()
            .enumerate()
            .filter_map(|(index, shape)| {
                let uses_height = self.uses_height(&shape.terrain_type_id);
                if !uses_height && !options.include_no_height_terrain {
                    return None;
                }
                let regions = los::shape_line_of_sight(shape, uses_height, p1, p2);
                (!regions.is_empty()).then_some(ShapeLineOfSight { shape: index, regions })
            })
            .collect()
    }

    /// Merges per-shape intersection regions into one ordered timeline.
    pub fn flatten_line_of_sight(
        &self,
        results: &[ShapeLineOfSight],
    ) -> Vec<FlattenedLineOfSightRegion> {
        los::flatten_line_of_sight(results)
    }

    fn validate_paint(
        &self,
        terrain_type_id: &str,
        height: f64,
        elevation: f64,
    ) -> Result<(f64, f64), Error> {
        let terrain = self
            .terrain_types
            .terrain_type(terrain_type_id)
            .ok_or_else(|| Error::UnknownTerrain(terrain_type_id.to_string()))?;
        if !terrain.uses_height {
            return Ok((0.0, 0.0));
        }
        if !height.is_finite() || height <= 0.0 {
            return Err(Error::InvalidHeight);
        }
        if !elevation.is_finite() || elevation < 0.0 {
            return Err(Error::InvalidElevation);
        }
        Ok((height, elevation))
    }

    fn uses_height(&self, terrain_type_id: &str) -> bool {
        self.terrain_types
            .terrain_type(terrain_type_id)
            .map_or(true, |t| t.uses_height)
    }

    fn cell_on_canvas(&self, cell: Cell) -> bool {
        let center = self.grid.cell_polygon(cell.row, cell.col).centroid();
        self.grid
            .canvas_bounds()
            .contains_xy(center.x, center.y, 0.0)
    }

    fn commit(&mut self, undo_entry: UndoEntry) -> Result<bool, Error> {
        if undo_entry.is_empty() {
            return Ok(false);
        }
        self.history.push(undo_entry);
        self.recompute_shapes()?;
        Ok(true)
    }

    fn recompute_shapes(&mut self) -> Result<(), Error> {
        self.shapes = shape::build_shapes(&self.data, &self.grid)?;
        Ok(())
    }
}

fn dedup(cells: &[Cell]) -> Vec<Cell> {
    let mut seen = BTreeSet::new();
    cells.iter().copied().filter(|c| seen.insert(*c)).collect()
}

/// Applies one paint operation to one stack. The caller re-normalizes and
/// records history when this reports a change.
fn apply_paint(
    stack: &mut LayerStack,
    terrain_type_id: &str,
    uses_height: bool,
    elevation: f64,
    height: f64,
    mode: PaintMode,
) -> bool {
    if let PaintMode::TotalReplace = mode {
        let replacement: LayerStack =
            smallvec![TerrainLayer::new(terrain_type_id, elevation, height)];
        if *stack == replacement {
            return false;
        }
        *stack = replacement;
        return true;
    }

    if !uses_height {
        if stack.iter().any(|l| l.terrain_type_id == terrain_type_id) {
            return false;
        }
        stack.push(TerrainLayer::new(terrain_type_id, 0.0, 0.0));
        return true;
    }

    match mode {
        PaintMode::DestructiveMerge => {
            let clipped = stack::clip_between(stack, elevation, elevation + height, |layer| {
                layer.terrain_type_id != terrain_type_id && layer.uses_height()
            });
            let merged = stack::merge_same_type(stack, terrain_type_id, elevation, height);
            clipped || merged
        }
        PaintMode::AdditiveMerge => {
            let blockers: Vec<(f64, f64)> = stack
                .iter()
                .filter(|l| l.terrain_type_id != terrain_type_id && l.uses_height())
                .map(|l| (l.elevation, l.top()))
                .collect();
            let mut changed = false;
            for (lo, hi) in stack::subtract_intervals((elevation, elevation + height), &blockers) {
                if hi > lo {
                    changed |= stack::merge_same_type(stack, terrain_type_id, lo, hi - lo);
                }
            }
            changed
        }
        PaintMode::TotalReplace => unreachable!("handled above"),
    }
}

/// Compares a candidate cell's stack against the fill origin's stack.
fn stacks_match(
    candidate: &[TerrainLayer],
    origin: &[TerrainLayer],
    boundary: FillBoundary,
    bottom: f64,
    top: f64,
) -> bool {
    match boundary {
        // stacks are kept normalized, so whole-stack equality is
        // order-insensitive already
        FillBoundary::StrictBoundary => candidate == origin,
        FillBoundary::ApplicableBoundary => {
            sliced_layers(candidate, bottom, top) == sliced_layers(origin, bottom, top)
                && no_height_ids(candidate) == no_height_ids(origin)
        }
    }
}

/// The height-using layers of a stack, clipped to `[bottom, top]`.
fn sliced_layers(stack: &[TerrainLayer], bottom: f64, top: f64) -> Vec<(&str, f64, f64)> {
    let mut slices: Vec<(&str, f64, f64)> = stack
        .iter()
        .filter(|l| l.uses_height())
        .filter_map(|l| {
            let lo = l.elevation.max(bottom);
            let hi = l.top().min(top);
            (hi > lo).then_some((l.terrain_type_id.as_str(), lo, hi))
        })
        .collect();
    slices.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    slices
}

fn no_height_ids(stack: &[TerrainLayer]) -> Vec<&str> {
    let mut ids: Vec<&str> = stack
        .iter()
        .filter(|l| !l.uses_height())
        .map(|l| l.terrain_type_id.as_str())
        .collect();
    ids.sort_unstable();
    ids
}
