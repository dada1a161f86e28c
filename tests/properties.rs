//! Randomized invariants over generated cell maps, with fixed seeds so
//! failures reproduce.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terrain_height::geometry::Rect;
use terrain_height::{
    Cell, EraseOptions, FillBoundary, HeightMap, HeightMapData, InMemoryTerrainTypes,
    LineOfSightOptions, PaintMode, Point3, SquareGrid, UNDO_HISTORY_LIMIT,
};

const GRID_CELLS: i32 = 10;

fn registry() -> InMemoryTerrainTypes {
    InMemoryTerrainTypes::new()
        .with("stone", "Stone Wall", true)
        .with("mud", "Mud", true)
        .with("fog", "Fog", false)
}

fn map() -> HeightMap<SquareGrid, InMemoryTerrainTypes> {
    let side = f64::from(GRID_CELLS) * 100.0;
    let grid = SquareGrid::new(100.0, 100.0, Rect::new((0.0, 0.0), (side, side)));
    HeightMap::new(grid, registry())
}

fn random_cells(rng: &mut StdRng) -> Vec<Cell> {
    let count = rng.gen_range(1..8);
    (0..count)
        .map(|_| Cell::new(rng.gen_range(0..GRID_CELLS), rng.gen_range(0..GRID_CELLS)))
        .collect()
}

fn random_terrain(rng: &mut StdRng) -> &'static str {
    ["stone", "mud", "fog"][rng.gen_range(0..3)]
}

fn random_mode(rng: &mut StdRng) -> PaintMode {
    [
        PaintMode::TotalReplace,
        PaintMode::DestructiveMerge,
        PaintMode::AdditiveMerge,
    ][rng.gen_range(0..3)]
}

/// Applies one random valid edit.
fn random_edit(map: &mut HeightMap<SquareGrid, InMemoryTerrainTypes>, rng: &mut StdRng) {
    // integral heights and elevations so merged layers compare exactly
    let height = f64::from(rng.gen_range(1..5));
    let elevation = f64::from(rng.gen_range(0..4));
    match rng.gen_range(0..10) {
        0..=5 => {
            map.paint_cells(
                &random_cells(rng),
                random_terrain(rng),
                height,
                elevation,
                random_mode(rng),
            )
            .unwrap();
        }
        6..=7 => {
            let options = EraseOptions {
                bottom: f64::from(rng.gen_range(0..3)),
                top: f64::from(rng.gen_range(3..7)),
                ..EraseOptions::default()
            };
            map.erase_cells(&random_cells(rng), &options).unwrap();
        }
        _ => {
            let boundary = if rng.gen_bool(0.5) {
                FillBoundary::StrictBoundary
            } else {
                FillBoundary::ApplicableBoundary
            };
            let origin = Cell::new(rng.gen_range(0..GRID_CELLS), rng.gen_range(0..GRID_CELLS));
            map.fill_cells(origin, random_terrain(rng), height, elevation, boundary)
                .unwrap();
        }
    }
}

fn random_map(rng: &mut StdRng, edits: usize) -> HeightMap<SquareGrid, InMemoryTerrainTypes> {
    let mut map = map();
    for _ in 0..edits {
        random_edit(&mut map, rng);
    }
    map
}

#[test]
fn paint_then_undo_restores_the_previous_map() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..40 {
        let mut map = random_map(&mut rng, 6);
        let snapshot = map.data().clone();
        let changed = map
            .paint_cells(
                &random_cells(&mut rng),
                random_terrain(&mut rng),
                f64::from(rng.gen_range(1..5)),
                f64::from(rng.gen_range(0..4)),
                random_mode(&mut rng),
            )
            .unwrap();
        if changed {
            assert!(map.undo().unwrap());
        }
        assert_eq!(map.data(), &snapshot);
    }
}

#[test]
fn shape_cells_always_carry_a_matching_layer() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..25 {
        let map = random_map(&mut rng, 10);
        for shape in map.current_shapes() {
            for cell in &shape.cells {
                let matched = map.get_cell(cell.row, cell.col).iter().any(|layer| {
                    layer.terrain_type_id == shape.terrain_type_id
                        && layer.elevation == shape.elevation
                        && layer.height == shape.height
                });
                assert!(
                    matched,
                    "cell {cell} of a {} shape has no matching layer",
                    shape.terrain_type_id
                );
            }
        }
    }
}

#[test]
fn shape_windings_and_hole_containment_hold() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..25 {
        let map = random_map(&mut rng, 10);
        for shape in map.current_shapes() {
            assert!(shape.polygon.is_clockwise());
            for hole in &shape.holes {
                assert!(!hole.is_clockwise());
                assert!(shape
                    .polygon
                    .bounding_box()
                    .contains_rect(hole.bounding_box(), 1.0));
                assert!(shape.polygon.contains_polygon(hole));
            }
        }
    }
}

#[test]
fn regions_are_ordered_and_fit_the_ray() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..25 {
        let map = random_map(&mut rng, 8);
        for _ in 0..20 {
            let mut point = || {
                Point3::new(
                    rng.gen_range(-100.0..1100.0),
                    rng.gen_range(-100.0..1100.0),
                    rng.gen_range(0.0..6.0),
                )
            };
            let (p1, p2) = (point(), point());
            let options = LineOfSightOptions { include_no_height_terrain: true };
            for result in map.calculate_line_of_sight(p1, p2, &options) {
                let mut total = 0.0;
                let mut cursor = -1.0;
                for region in &result.regions {
                    assert!(region.start.t >= 0.0 && region.end.t <= 1.0 + 1e-9);
                    assert!(region.start.t < region.end.t, "degenerate region");
                    assert!(region.start.t >= cursor, "regions overlap or are unsorted");
                    cursor = region.end.t;
                    total += region.end.t - region.start.t;
                }
                assert!(total <= 1.0 + 1e-9);
            }
        }
    }
}

#[test]
fn rays_above_every_shape_are_gated_out() {
    let mut rng = StdRng::seed_from_u64(19);
    let mut map = map();
    // only height-using terrain, so every shape is gated by height
    for _ in 0..6 {
        map.paint_cells(
            &random_cells(&mut rng),
            if rng.gen_bool(0.5) { "stone" } else { "mud" },
            f64::from(rng.gen_range(1..5)),
            f64::from(rng.gen_range(0..4)),
            PaintMode::DestructiveMerge,
        )
        .unwrap();
    }
    let ceiling = map
        .current_shapes()
        .iter()
        .map(|s| s.top())
        .fold(0.0, f64::max)
        + 1.0;
    let results = map.calculate_line_of_sight(
        Point3::new(-50.0, 450.0, ceiling),
        Point3::new(1050.0, 450.0, ceiling),
        &LineOfSightOptions::default(),
    );
    assert!(results.is_empty());
}

#[test]
fn serialization_round_trips() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..20 {
        let map = random_map(&mut rng, 10);
        let value = map.save().unwrap();
        let reloaded = HeightMapData::from_json(value).unwrap();
        assert_eq!(&reloaded, map.data());
    }
}

#[test]
fn history_keeps_only_the_last_ten_edits() {
    let mut map = map();
    for i in 0..15 {
        map.paint_cells(
            &[Cell::new(0, i)],
            "stone",
            1.0,
            0.0,
            PaintMode::DestructiveMerge,
        )
        .unwrap();
    }
    let mut undos = 0;
    while map.undo().unwrap() {
        undos += 1;
    }
    assert_eq!(undos, UNDO_HISTORY_LIMIT);
    // the five oldest paints survive the exhausted history
    assert_eq!(map.data().len(), 15 - UNDO_HISTORY_LIMIT);
}

#[test]
fn loading_existing_data_builds_shapes() {
    let mut rng = StdRng::seed_from_u64(29);
    let source = random_map(&mut rng, 10);
    let grid = SquareGrid::new(100.0, 100.0, Rect::new((0.0, 0.0), (1000.0, 1000.0)));
    let reloaded = HeightMap::with_data(
        grid,
        registry(),
        HeightMapData::from_json(source.save().unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(reloaded.current_shapes().len(), source.current_shapes().len());
    for (a, b) in reloaded
        .current_shapes()
        .iter()
        .zip(source.current_shapes())
    {
        assert_eq!(a.terrain_type_id, b.terrain_type_id);
        assert_eq!(a.cells, b.cells);
        assert_eq!(a.polygon.vertices().len(), b.polygon.vertices().len());
    }
}

#[test]
fn non_height_layers_never_store_an_extent() {
    let mut rng = StdRng::seed_from_u64(31);
    let map = random_map(&mut rng, 20);
    for (_, stack) in map.data().iter() {
        for layer in stack {
            if layer.terrain_type_id == "fog" {
                assert_eq!((layer.elevation, layer.height), (0.0, 0.0));
            } else {
                assert!(layer.height > 0.0);
            }
        }
    }
}
