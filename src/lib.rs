//! 2.5D terrain height shapes and line-of-sight queries for gridded
//! tabletop scenes.
//!
//! The crate turns a sparse per-cell map of terrain annotations into merged
//! solid shapes and answers 3D line-of-sight queries against them. It is a
//! floating-point geometry kernel with documented tolerances: single
//! threaded, synchronous, and free of global state. Rendering, preferences
//! and persistence beyond the cell map's on-disk shape belong to the host.
//!
//! # Types
//!
//! - **[`HeightMap`]**: the core facade, owning the cell data, the derived
//!   shape list and the undo history
//! - **[`HeightMapData`]**: the sparse cell → layer-stack map, with v0/v1
//!   JSON persistence
//! - **[`TerrainLayer`]**: one vertical slab of a terrain type on a cell
//! - **[`Cell`]**: a `(row, col)` grid address, serialized as `"row|col"`
//! - **[`HeightMapShape`]**: a merged solid with holes, the unit
//!   line-of-sight works against
//! - **[`Point`](geometry::Point)**, **[`LineSegment`](geometry::LineSegment)**,
//!   **[`Polygon`](geometry::Polygon)**, **[`Rect`](geometry::Rect)**: the 2D
//!   geometry kernel underneath
//!
//! # Collaborator contracts
//!
//! - **[`GridAdapter`]**: maps cells to pixel-space polygons and enumerates
//!   neighbors; [`SquareGrid`] and [`HexGrid`] are provided, gridless scenes
//!   are rejected with [`Error::UnsupportedGrid`]
//! - **[`TerrainTypeRegistry`]**: resolves terrain type ids to
//!   `{name, uses_height}`; [`InMemoryTerrainTypes`] is provided
//!
//! # Editing
//!
//! [`HeightMap::paint_cells`] supports three overlap-resolving modes
//! ([`PaintMode`]), [`HeightMap::erase_cells`] clips by type and vertical
//! range, [`HeightMap::fill_cells`] flood-fills under a boundary rule
//! ([`FillBoundary`]), and [`HeightMap::undo`] reverts the last edit from a
//! bounded history. Every successful edit synchronously rebuilds the shape
//! list, so [`HeightMap::current_shapes`] always reflects the latest edit.
//!
//! # Line of sight
//!
//! [`HeightMap::calculate_line_of_sight`] intersects a 3D ray with every
//! eligible shape, reporting ordered regions that distinguish clean
//! crossings from skims along faces or tops;
//! [`flatten_line_of_sight`](HeightMap::flatten_line_of_sight) merges the
//! per-shape regions into one timeline.
//!
//! # Tolerances
//!
//! All geometric predicates run on `f64` with the constants exported from
//! [`geometry`]: a 1-pixel point tolerance, a 0.05-radian parallelism
//! tolerance and a 16 px² skim distance. They are part of the crate's
//! contract and are referenced by the test-suite.

pub mod geometry;
pub mod grid;
pub mod los;

mod error;
mod heightmap;
mod shape;
mod terrain;

pub use error::Error;
pub use grid::{Grid, GridAdapter, GridFamily, GridType, HexGrid, SquareGrid};
pub use heightmap::{
    Cell, EraseOptions, FillBoundary, HeightMap, HeightMapData, LayerStack, PaintMode,
    ParseCellError, TerrainLayer, UNDO_HISTORY_LIMIT,
};
pub use los::{
    FlattenedLineOfSightRegion, LineOfSightIntersectionRegion, LineOfSightOptions,
    LineOfSightPoint, Point3, ShapeLineOfSight, SkimSide,
};
pub use shape::HeightMapShape;
pub use terrain::{InMemoryTerrainTypes, TerrainType, TerrainTypeRegistry};
