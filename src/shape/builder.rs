//! Builds merged terrain shapes from the current cell map.
//!
//! Cells are grouped by `(terrain type, height, elevation)`; within a group,
//! the grid polygons of all cells are decomposed into edges, edges shared by
//! two cells cancel, and the surviving edges are chained into closed
//! perimeters. Clockwise perimeters are solids, counter-clockwise ones are
//! holes to be matched with their innermost containing solid.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Error;
use crate::geometry::{LineSegment, Point, Polygon};
use crate::grid::GridAdapter;
use crate::heightmap::{Cell, HeightMapData};
use crate::shape::HeightMapShape;

/// Grouping key: terrain type plus bit-exact height and elevation.
type GroupKey = (String, u64, u64);

struct GroupEdge {
    segment: LineSegment,
    cell: Cell,
    cancelled: bool,
}

pub(crate) fn build_shapes(
    data: &HeightMapData,
    grid: &impl GridAdapter,
) -> Result<Vec<HeightMapShape>, Error> {
    let mut groups: BTreeMap<GroupKey, Vec<Cell>> = BTreeMap::new();
    for (cell, stack) in data.iter() {
        for layer in stack {
            let key = (
                layer.terrain_type_id.clone(),
                layer.height.to_bits(),
                layer.elevation.to_bits(),
            );
            groups.entry(key).or_default().push(cell);
        }
    }

    let mut shapes = Vec::new();
    for ((terrain_type_id, height_bits, elevation_bits), cells) in groups {
        shapes.extend(build_group(
            &terrain_type_id,
            f64::from_bits(height_bits),
            f64::from_bits(elevation_bits),
            cells,
            grid,
        )?);
    }
    Ok(shapes)
}

fn build_group(
    terrain_type_id: &str,
    height: f64,
    elevation: f64,
    mut cells: Vec<Cell>,
    grid: &impl GridAdapter,
) -> Result<Vec<HeightMapShape>, Error> {
    cells.sort_unstable();
    let cell_set: BTreeSet<Cell> = cells.iter().copied().collect();

    // decompose every cell polygon into edges tagged with their owner
    let mut edges: Vec<GroupEdge> = Vec::new();
    let mut cell_edges: BTreeMap<Cell, Vec<usize>> = BTreeMap::new();
    for &cell in &cells {
        let polygon = grid.cell_polygon(cell.row, cell.col);
        let indices = polygon
            .edges()
            .iter()
            .map(|&segment| {
                edges.push(GroupEdge { segment, cell, cancelled: false });
                edges.len() - 1
            })
            .collect();
        cell_edges.insert(cell, indices);
    }

    // cancel edges shared between grid-adjacent cells of the group; every
    // cancellation records the two cells as adjacent
    let mut adjacency: BTreeMap<Cell, BTreeSet<Cell>> = BTreeMap::new();
    for &cell in &cells {
        for (row, col) in grid.fill_neighbors(cell.row, cell.col) {
            let neighbor = Cell::new(row, col);
            // visit each unordered pair once
            if neighbor <= cell || !cell_set.contains(&neighbor) {
                continue;
            }
            let shared = cell_edges[&cell].iter().find_map(|&i| {
                cell_edges[&neighbor]
                    .iter()
                    .find(|&&j| edges[i].segment.coincident_with(&edges[j].segment))
                    .map(|&j| (i, j))
            });
            if let Some((i, j)) = shared {
                edges[i].cancelled = true;
                edges[j].cancelled = true;
                adjacency.entry(cell).or_default().insert(neighbor);
                adjacency.entry(neighbor).or_default().insert(cell);
            }
        }
    }

    // chain the surviving edges into closed perimeters
    let mut used: Vec<bool> = edges.iter().map(|e| e.cancelled).collect();
    let mut solids: Vec<(Polygon, BTreeSet<Cell>)> = Vec::new();
    let mut holes: Vec<Polygon> = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let (polygon, owners) = trace_perimeter(&edges, &mut used, start)?;
        if polygon.is_clockwise() {
            let cells = collect_shape_cells(owners, &adjacency);
            solids.push((polygon, cells));
        } else {
            holes.push(polygon);
        }
    }

    let mut shapes: Vec<HeightMapShape> = solids
        .into_iter()
        .map(|(polygon, cells)| HeightMapShape {
            terrain_type_id: terrain_type_id.to_string(),
            polygon,
            holes: Vec::new(),
            elevation,
            height,
            cells,
        })
        .collect();

    for hole in holes {
        let owner = find_hole_owner(&hole, &shapes)?;
        shapes[owner].holes.push(hole);
    }

    Ok(shapes)
}

/// Chains edges starting from `start` until the loop closes. At vertices
/// where several edges could continue (square-grid corner touches), the one
/// making the tightest clockwise interior angle wins, which keeps
/// corner-touching rings properly nested.
fn trace_perimeter(
    edges: &[GroupEdge],
    used: &mut [bool],
    start: usize,
) -> Result<(Polygon, BTreeSet<Cell>), Error> {
    let mut chain = vec![start];
    used[start] = true;
    let start_point = edges[start].segment.p1();
    let mut tail = start;

    loop {
        let tail_end = edges[tail].segment.p2();
        if tail_end.coincident(&start_point) {
            break;
        }
        let mut next: Option<usize> = None;
        for (i, edge) in edges.iter().enumerate() {
            if used[i] || !edge.segment.p1().coincident(&tail_end) {
                continue;
            }
            let better = match next {
                None => true,
                Some(best) => {
                    edges[tail].segment.angle_between(&edge.segment)
                        < edges[tail].segment.angle_between(&edges[best].segment)
                }
            };
            if better {
                next = Some(i);
            }
        }
        let next = next.ok_or(Error::MissingEdge)?;
        used[next] = true;
        chain.push(next);
        tail = next;
    }

    let vertices: Vec<Point> = chain.iter().map(|&i| edges[i].segment.p1()).collect();
    let owners: BTreeSet<Cell> = chain.iter().map(|&i| edges[i].cell).collect();
    Ok((Polygon::new(simplify_collinear(vertices)), owners))
}

/// Drops vertices whose two incident edges are collinear, so straight runs
/// of cell borders merge into single polygon edges.
fn simplify_collinear(vertices: Vec<Point>) -> Vec<Point> {
    let n = vertices.len();
    if n < 4 {
        return vertices;
    }
    let kept: Vec<Point> = (0..n)
        .filter(|&i| {
            let incoming = LineSegment::new(vertices[(i + n - 1) % n], vertices[i]);
            let outgoing = LineSegment::new(vertices[i], vertices[(i + 1) % n]);
            !incoming.is_parallel_to(&outgoing)
        })
        .map(|i| vertices[i])
        .collect();
    if kept.len() >= 3 {
        kept
    } else {
        vertices
    }
}

/// Expands a perimeter's edge-owning cells through the adjacency relation,
/// pulling in interior cells all of whose edges cancelled.
fn collect_shape_cells(
    owners: BTreeSet<Cell>,
    adjacency: &BTreeMap<Cell, BTreeSet<Cell>>,
) -> BTreeSet<Cell> {
    let mut cells = owners;
    let mut frontier: Vec<Cell> = cells.iter().copied().collect();
    while let Some(cell) = frontier.pop() {
        if let Some(neighbors) = adjacency.get(&cell) {
            for &neighbor in neighbors {
                if cells.insert(neighbor) {
                    frontier.push(neighbor);
                }
            }
        }
    }
    cells
}

/// Finds the solid a hole belongs to.
///
/// With a single containing solid the answer is immediate. Nested solids can
/// all contain the hole; the innermost one is found by casting a horizontal
/// ray leftwards from the hole's topmost vertex and picking the solid whose
/// outer ring is hit nearest. No container at all means an upstream
/// invariant broke.
fn find_hole_owner(hole: &Polygon, shapes: &[HeightMapShape]) -> Result<usize, Error> {
    let containers: Vec<usize> = shapes
        .iter()
        .enumerate()
        .filter(|(_, shape)| shape.polygon.contains_polygon(hole))
        .map(|(i, _)| i)
        .collect();

    match containers.as_slice() {
        [] => Err(Error::InvalidShapeGraph),
        [only] => Ok(*only),
        _ => {
            let probe = hole
                .vertices()
                .iter()
                .min_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
                .expect("non-empty vertex ring");
            containers
                .into_iter()
                .filter_map(|i| {
                    nearest_left_edge_distance(&shapes[i].polygon, probe).map(|d| (i, d))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
                .ok_or(Error::InvalidShapeGraph)
        }
    }
}

/// Distance from `probe` to the nearest outer-ring crossing of a leftward
/// horizontal ray.
fn nearest_left_edge_distance(polygon: &Polygon, probe: &Point) -> Option<f64> {
    let mut nearest: Option<f64> = None;
    for edge in polygon.edges() {
        let (y1, y2) = (edge.p1().y, edge.p2().y);
        if (y1 < probe.y && y2 < probe.y) || (y1 > probe.y && y2 > probe.y) || y1 == y2 {
            continue;
        }
        let x_int = edge.p1().x + (probe.y - y1) / (y2 - y1) * edge.dx();
        let distance = probe.x - x_int;
        if distance >= 0.0 && nearest.is_none_or(|d| distance < d) {
            nearest = Some(distance);
        }
    }
    nearest
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Rect;
    use crate::grid::SquareGrid;
    use crate::heightmap::TerrainLayer;

    fn grid() -> SquareGrid {
        SquareGrid::new(100.0, 100.0, Rect::new((0.0, 0.0), (10_000.0, 10_000.0)))
    }

    fn data(cells: &[(i32, i32)]) -> HeightMapData {
        let mut data = HeightMapData::new();
        for &(row, col) in cells {
            data.stack_mut(Cell::new(row, col))
                .push(TerrainLayer::new("wall", 0.0, 1.0));
        }
        data
    }

    fn ring(polygon: &Polygon) -> Vec<(f64, f64)> {
        polygon.vertices().iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn two_cells_merge_into_a_rectangle() {
        let shapes = build_shapes(&data(&[(0, 0), (0, 1)]), &grid()).unwrap();
        assert_eq!(shapes.len(), 1);
        let shape = &shapes[0];
        assert!(shape.holes.is_empty());
        assert!(shape.polygon.is_clockwise());
        assert_eq!(
            ring(&shape.polygon),
            vec![(0.0, 0.0), (200.0, 0.0), (200.0, 100.0), (0.0, 100.0)]
        );
        assert_eq!(
            shape.cells,
            BTreeSet::from([Cell::new(0, 0), Cell::new(0, 1)])
        );
    }

    #[test]
    fn ring_of_cells_grows_a_hole() {
        // 3×3 block minus the center
        let cells: Vec<(i32, i32)> = (0..3)
            .flat_map(|r| (0..3).map(move |c| (r, c)))
            .filter(|&(r, c)| !(r == 1 && c == 1))
            .collect();
        let shapes = build_shapes(&data(&cells), &grid()).unwrap();
        assert_eq!(shapes.len(), 1);
        let shape = &shapes[0];
        assert!(shape.polygon.is_clockwise());
        assert_eq!(shape.holes.len(), 1);
        let hole = &shape.holes[0];
        assert!(!hole.is_clockwise());
        assert!(hole
            .bounding_box()
            .contains_xy(150.0, 150.0, 0.0));
        assert_eq!(hole.vertices().len(), 4);
        assert_eq!(shape.cells.len(), 8);
    }

    #[test]
    fn interior_cells_join_via_adjacency() {
        // full 3×3 block: the center cell's edges all cancel, yet it must be
        // part of the shape's cell set
        let cells: Vec<(i32, i32)> = (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        let shapes = build_shapes(&data(&cells), &grid()).unwrap();
        assert_eq!(shapes.len(), 1);
        assert!(shapes[0].holes.is_empty());
        assert_eq!(shapes[0].cells.len(), 9);
        assert!(shapes[0].cells.contains(&Cell::new(1, 1)));
    }

    #[test]
    fn corner_touching_cells_stay_separate_shapes() {
        let shapes = build_shapes(&data(&[(0, 0), (1, 1)]), &grid()).unwrap();
        assert_eq!(shapes.len(), 2);
        assert!(shapes.iter().all(|s| s.holes.is_empty()));
        assert!(shapes.iter().all(|s| s.cells.len() == 1));
    }

    #[test]
    fn groups_split_by_layer_parameters() {
        let mut data = HeightMapData::new();
        data.stack_mut(Cell::new(0, 0))
            .push(TerrainLayer::new("wall", 0.0, 1.0));
        data.stack_mut(Cell::new(0, 1))
            .push(TerrainLayer::new("wall", 0.0, 2.0));
        let shapes = build_shapes(&data, &grid()).unwrap();
        // differing heights: no merge
        assert_eq!(shapes.len(), 2);

        // a cell with two layers contributes to two groups
        let mut data = HeightMapData::new();
        data.stack_mut(Cell::new(0, 0))
            .push(TerrainLayer::new("wall", 0.0, 1.0));
        data.stack_mut(Cell::new(0, 0))
            .push(TerrainLayer::new("fog", 3.0, 1.0));
        let shapes = build_shapes(&data, &grid()).unwrap();
        assert_eq!(shapes.len(), 2);
    }

    #[test]
    fn hex_cells_merge_including_interior() {
        use crate::grid::HexGrid;
        let grid = HexGrid::rows(
            100.0,
            100.0,
            Rect::new((0.0, 0.0), (10_000.0, 10_000.0)),
            true,
        );
        // a hex plus all six of its neighbors: the center's edges all cancel
        let mut cells = vec![(5, 5)];
        cells.extend(grid.fill_neighbors(5, 5));
        let shapes = build_shapes(&data(&cells), &grid).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].cells.len(), 7);
        assert!(shapes[0].holes.is_empty());
        // the merged outline has 6 cells × 4 surviving edges − shared runs;
        // at minimum it is closed and clockwise
        assert!(shapes[0].polygon.is_clockwise());
        assert_eq!(shapes[0].polygon.vertices().len(), 18);
    }
}
