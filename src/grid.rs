//! Grid geometry adapters.
//!
//! The core never reaches into a global canvas object: everything it needs to
//! know about the scene's grid comes through the [`GridAdapter`] contract.
//! Square grids and the four offset hexagonal layouts are provided here;
//! gridless scenes are rejected at construction.

use crate::error::Error;
use crate::geometry::{Point, Polygon, Rect};

/// The broad family a grid belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridFamily {
    Square,
    /// Pointy-top hexes arranged in staggered rows.
    HexRows,
    /// Flat-top hexes arranged in staggered columns.
    HexCols,
}

/// Grid geometry the core consumes.
///
/// `(row, col)` indices are unbounded integers; the adapter maps them into
/// scene pixel space.
pub trait GridAdapter {
    /// The closed, clockwise polygon of one cell in pixel space.
    fn cell_polygon(&self, row: i32, col: i32) -> Polygon;

    /// The edge-sharing neighbors of a cell: 4 orthogonal cells on square
    /// grids, 6 adjacents on hex grids.
    fn fill_neighbors(&self, row: i32, col: i32) -> Vec<(i32, i32)>;

    fn grid_family(&self) -> GridFamily;

    /// The scene's canvas rectangle in pixel space; flood fills never leave
    /// it.
    fn canvas_bounds(&self) -> Rect;

    /// `(width, height)` of one cell in pixels.
    fn cell_size(&self) -> (f64, f64);
}

/// Host-facing grid configuration, mirroring the grid types tabletop scenes
/// declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridType {
    Gridless,
    Square,
    HexOddRows,
    HexEvenRows,
    HexOddCols,
    HexEvenCols,
}

impl GridType {
    /// Builds the adapter for this configuration.
    ///
    /// Gridless scenes have no cell geometry to offer the shape builder and
    /// are rejected with [`Error::UnsupportedGrid`].
    pub fn build(self, cell_width: f64, cell_height: f64, canvas_bounds: Rect) -> Result<Grid, Error> {
        match self {
            GridType::Gridless => Err(Error::UnsupportedGrid),
            GridType::Square => Ok(Grid::Square(SquareGrid::new(
                cell_width,
                cell_height,
                canvas_bounds,
            ))),
            GridType::HexOddRows => Ok(Grid::Hex(HexGrid::rows(cell_width, cell_height, canvas_bounds, true))),
            GridType::HexEvenRows => Ok(Grid::Hex(HexGrid::rows(cell_width, cell_height, canvas_bounds, false))),
            GridType::HexOddCols => Ok(Grid::Hex(HexGrid::cols(cell_width, cell_height, canvas_bounds, true))),
            GridType::HexEvenCols => Ok(Grid::Hex(HexGrid::cols(cell_width, cell_height, canvas_bounds, false))),
        }
    }
}

/// Either provided adapter, dispatching [`GridAdapter`] by value.
#[derive(Clone, Debug)]
pub enum Grid {
    Square(SquareGrid),
    Hex(HexGrid),
}

impl GridAdapter for Grid {
    fn cell_polygon(&self, row: i32, col: i32) -> Polygon {
        match self {
            Grid::Square(g) => g.cell_polygon(row, col),
            Grid::Hex(g) => g.cell_polygon(row, col),
        }
    }

    fn fill_neighbors(&self, row: i32, col: i32) -> Vec<(i32, i32)> {
        match self {
            Grid::Square(g) => g.fill_neighbors(row, col),
            Grid::Hex(g) => g.fill_neighbors(row, col),
        }
    }

    fn grid_family(&self) -> GridFamily {
        match self {
            Grid::Square(g) => g.grid_family(),
            Grid::Hex(g) => g.grid_family(),
        }
    }

    fn canvas_bounds(&self) -> Rect {
        match self {
            Grid::Square(g) => g.canvas_bounds(),
            Grid::Hex(g) => g.canvas_bounds(),
        }
    }

    fn cell_size(&self) -> (f64, f64) {
        match self {
            Grid::Square(g) => g.cell_size(),
            Grid::Hex(g) => g.cell_size(),
        }
    }
}

/// Axis-aligned square grid with the cell `(0, 0)` anchored at the origin.
#[derive(Clone, Debug)]
pub struct SquareGrid {
    cell_width: f64,
    cell_height: f64,
    bounds: Rect,
}

impl SquareGrid {
    pub fn new(cell_width: f64, cell_height: f64, bounds: Rect) -> Self {
        SquareGrid { cell_width, cell_height, bounds }
    }
}

impl GridAdapter for SquareGrid {
    fn cell_polygon(&self, row: i32, col: i32) -> Polygon {
        let x0 = f64::from(col) * self.cell_width;
        let y0 = f64::from(row) * self.cell_height;
        let x1 = x0 + self.cell_width;
        let y1 = y0 + self.cell_height;
        Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    fn fill_neighbors(&self, row: i32, col: i32) -> Vec<(i32, i32)> {
        vec![(row - 1, col), (row + 1, col), (row, col - 1), (row, col + 1)]
    }

    fn grid_family(&self) -> GridFamily {
        GridFamily::Square
    }

    fn canvas_bounds(&self) -> Rect {
        self.bounds
    }

    fn cell_size(&self) -> (f64, f64) {
        (self.cell_width, self.cell_height)
    }
}

/// Offset hexagonal grid in either orientation.
///
/// Row layouts stagger alternate rows right by half a cell; column layouts
/// stagger alternate columns down by half a cell. `shift_odd` selects whether
/// the odd or the even rows/columns are the staggered ones.
#[derive(Clone, Debug)]
pub struct HexGrid {
    family: GridFamily,
    cell_width: f64,
    cell_height: f64,
    bounds: Rect,
    shift_odd: bool,
}

impl HexGrid {
    pub fn rows(cell_width: f64, cell_height: f64, bounds: Rect, shift_odd: bool) -> Self {
        HexGrid {
            family: GridFamily::HexRows,
            cell_width,
            cell_height,
            bounds,
            shift_odd,
        }
    }

    pub fn cols(cell_width: f64, cell_height: f64, bounds: Rect, shift_odd: bool) -> Self {
        HexGrid {
            family: GridFamily::HexCols,
            cell_width,
            cell_height,
            bounds,
            shift_odd,
        }
    }

    fn shifted(&self, line: i32) -> bool {
        (line.rem_euclid(2) == 1) == self.shift_odd
    }

    fn center(&self, row: i32, col: i32) -> Point {
        let (w, h) = (self.cell_width, self.cell_height);
        match self.family {
            GridFamily::HexRows => {
                let offset = if self.shifted(row) { 0.5 } else { 0.0 };
                Point::new(
                    (f64::from(col) + offset) * w + w / 2.0,
                    f64::from(row) * h * 0.75 + h / 2.0,
                )
            }
            GridFamily::HexCols => {
                let offset = if self.shifted(col) { 0.5 } else { 0.0 };
                Point::new(
                    f64::from(col) * w * 0.75 + w / 2.0,
                    (f64::from(row) + offset) * h + h / 2.0,
                )
            }
            GridFamily::Square => unreachable!("hex grid with square family"),
        }
    }
}

impl GridAdapter for HexGrid {
    fn cell_polygon(&self, row: i32, col: i32) -> Polygon {
        let c = self.center(row, col);
        let (w, h) = (self.cell_width, self.cell_height);
        let vertices = match self.family {
            // pointy-top, traced clockwise from the top vertex
            GridFamily::HexRows => vec![
                Point::new(c.x, c.y - h / 2.0),
                Point::new(c.x + w / 2.0, c.y - h / 4.0),
                Point::new(c.x + w / 2.0, c.y + h / 4.0),
                Point::new(c.x, c.y + h / 2.0),
                Point::new(c.x - w / 2.0, c.y + h / 4.0),
                Point::new(c.x - w / 2.0, c.y - h / 4.0),
            ],
            // flat-top, traced clockwise from the left vertex
            GridFamily::HexCols => vec![
                Point::new(c.x - w / 2.0, c.y),
                Point::new(c.x - w / 4.0, c.y - h / 2.0),
                Point::new(c.x + w / 4.0, c.y - h / 2.0),
                Point::new(c.x + w / 2.0, c.y),
                Point::new(c.x + w / 4.0, c.y + h / 2.0),
                Point::new(c.x - w / 4.0, c.y + h / 2.0),
            ],
            GridFamily::Square => unreachable!("hex grid with square family"),
        };
        Polygon::new(vertices)
    }

    fn fill_neighbors(&self, row: i32, col: i32) -> Vec<(i32, i32)> {
        match self.family {
            GridFamily::HexRows => {
                let diagonal = if self.shifted(row) {
                    [(-1, 0), (-1, 1), (1, 0), (1, 1)]
                } else {
                    [(-1, -1), (-1, 0), (1, -1), (1, 0)]
                };
                let mut neighbors = vec![(row, col - 1), (row, col + 1)];
                neighbors.extend(diagonal.iter().map(|&(dr, dc)| (row + dr, col + dc)));
                neighbors
            }
            GridFamily::HexCols => {
                let diagonal = if self.shifted(col) {
                    [(0, -1), (1, -1), (0, 1), (1, 1)]
                } else {
                    [(-1, -1), (0, -1), (-1, 1), (0, 1)]
                };
                let mut neighbors = vec![(row - 1, col), (row + 1, col)];
                neighbors.extend(diagonal.iter().map(|&(dr, dc)| (row + dr, col + dc)));
                neighbors
            }
            GridFamily::Square => unreachable!("hex grid with square family"),
        }
    }

    fn grid_family(&self) -> GridFamily {
        self.family
    }

    fn canvas_bounds(&self) -> Rect {
        self.bounds
    }

    fn cell_size(&self) -> (f64, f64) {
        (self.cell_width, self.cell_height)
    }
}
