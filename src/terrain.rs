//! Terrain type definitions and the registry contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A terrain type as configured by the host.
///
/// Types with `uses_height` false have no vertical extent of their own: their
/// painted layers carry zero elevation and height, and line-of-sight treats
/// them as reaching from the floor to infinity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainType {
    pub name: String,
    pub uses_height: bool,
}

/// Resolves terrain type ids to their definitions.
///
/// The host owns the palette; the core only ever asks whether an id exists
/// and whether it uses height.
pub trait TerrainTypeRegistry {
    fn terrain_type(&self, id: &str) -> Option<&TerrainType>;
}

/// A simple map-backed registry, suitable for hosts with a static palette
/// and for tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTerrainTypes {
    types: HashMap<String, TerrainType>,
}

impl InMemoryTerrainTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>, uses_height: bool) {
        self.types.insert(
            id.into(),
            TerrainType { name: name.into(), uses_height },
        );
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, id: impl Into<String>, name: impl Into<String>, uses_height: bool) -> Self {
        self.insert(id, name, uses_height);
        self
    }
}

impl TerrainTypeRegistry for InMemoryTerrainTypes {
    fn terrain_type(&self, id: &str) -> Option<&TerrainType> {
        self.types.get(id)
    }
}
