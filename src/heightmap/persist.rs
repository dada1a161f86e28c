//! On-disk forms of [`HeightMapData`].
//!
//! The current form (`v = 1`) is an object holding `["row|col", [layer, …]]`
//! pairs. A legacy flat-array form (`v = 0`) predating layer stacks is still
//! accepted on load; it is never written.

use serde::{Deserialize, Serialize};
use smallvec::smallvec;

use super::cell::Cell;
use super::stack::{self, LayerStack, TerrainLayer};
use super::store::HeightMapData;
use crate::terrain::TerrainTypeRegistry;

const CURRENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct VersionedMap {
    v: u32,
    data: Vec<(Cell, Vec<TerrainLayer>)>,
}

/// One entry of the legacy v0 array: a single layer on a single cell.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyEntry {
    position: (i32, i32),
    terrain_type_id: String,
    height: f64,
    #[serde(default)]
    elevation: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedMap {
    Versioned(VersionedMap),
    Legacy(Vec<LegacyEntry>),
}

impl HeightMapData {
    /// Serializes to the v1 on-disk form.
    ///
    /// Saving canonicalizes: cells whose stacks are empty are dropped, as is
    /// any layer whose terrain type the registry no longer knows.
    pub fn to_json(
        &self,
        terrain_types: &impl TerrainTypeRegistry,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let data: Vec<(Cell, Vec<TerrainLayer>)> = self
            .cells
            .iter()
            .filter_map(|(&cell, stack)| {
                let layers: Vec<TerrainLayer> = stack
                    .iter()
                    .filter(|layer| terrain_types.terrain_type(&layer.terrain_type_id).is_some())
                    .cloned()
                    .collect();
                (!layers.is_empty()).then_some((cell, layers))
            })
            .collect();
        serde_json::to_value(VersionedMap { v: CURRENT_VERSION, data })
    }

    /// Loads either on-disk form.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut map = HeightMapData::new();
        match serde_json::from_value(value)? {
            PersistedMap::Versioned(versioned) => {
                for (cell, layers) in versioned.data {
                    if layers.is_empty() {
                        continue;
                    }
                    let mut stack: LayerStack = layers.into_iter().collect();
                    stack::normalize(&mut stack);
                    map.cells.insert(cell, stack);
                }
            }
            PersistedMap::Legacy(entries) => {
                for entry in entries {
                    let cell = Cell::new(entry.position.0, entry.position.1);
                    let layer =
                        TerrainLayer::new(entry.terrain_type_id, entry.elevation, entry.height);
                    match map.cells.get_mut(&cell) {
                        Some(stack) => {
                            stack.push(layer);
                            stack::normalize(stack);
                        }
                        None => {
                            map.cells.insert(cell, smallvec![layer]);
                        }
                    }
                }
            }
        }
        Ok(map)
    }
}
