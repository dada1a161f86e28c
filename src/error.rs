use thiserror::Error;

/// Errors reported by the terrain height core.
///
/// The taxonomy is closed: every fallible operation in this crate returns one
/// of these kinds or succeeds. Validation errors (`UnknownTerrain`,
/// `InvalidHeight`, `InvalidElevation`) are raised before any mutation takes
/// place, so a failed edit never leaves the store half-edited.
/// `InvalidShapeGraph` and `MissingEdge` indicate a broken internal invariant
/// during shape rebuilding and should be treated as fatal by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The host tried to construct the core on a gridless scene.
    #[error("terrain height maps require a square or hexagonal grid")]
    UnsupportedGrid,

    /// A paint or fill referenced a terrain type the registry does not know.
    #[error("unknown terrain type `{0}`")]
    UnknownTerrain(String),

    /// Height must be a positive, finite number for height-using terrain.
    #[error("height must be a positive, finite number")]
    InvalidHeight,

    /// Elevation must be a non-negative, finite number for height-using
    /// terrain.
    #[error("elevation must be a non-negative, finite number")]
    InvalidElevation,

    /// A traced hole polygon was not contained by any solid polygon of its
    /// group.
    #[error("inconsistent shape graph: a hole has no containing shape")]
    InvalidShapeGraph,

    /// Perimeter tracing could not find an edge continuing the current chain.
    #[error("perimeter tracing found no continuing edge")]
    MissingEdge,
}
