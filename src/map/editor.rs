//! Map authoring store: grid placement and JSON export

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::catalog::AssetCatalog;
use super::loader::MapObject;

/// Editor canvas and grid
#[derive(Debug, Clone, Copy)]
pub struct EditorGrid {
    pub tile_size: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for EditorGrid {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            width: 1280.0,
            height: 960.0,
        }
    }
}

impl EditorGrid {
    /// Top-left corner of the tile containing `v`
    pub fn snap(&self, v: f32) -> f32 {
        (v / self.tile_size).floor() * self.tile_size
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width && y < self.height
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EditorError {
    #[error("Unknown object type '{0}'")]
    UnknownType(String),

    #[error("Object type '{0}' cannot be placed")]
    NotPlaceable(String),

    #[error("Position ({x}, {y}) is outside the editor canvas")]
    OutOfBounds { x: f32, y: f32 },
}

/// Result of a placement request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "object", rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// Appended to the store
    Placed(MapObject),
    /// Same type already at that tile; store unchanged
    Duplicate(MapObject),
}

impl PlacementOutcome {
    pub fn object(&self) -> &MapObject {
        match self {
            Self::Placed(o) | Self::Duplicate(o) => o,
        }
    }

    /// Human-readable status line
    pub fn message(&self) -> String {
        match self {
            Self::Placed(o) => format!("Placed {} at ({}, {}).", o.kind, o.x, o.y),
            Self::Duplicate(o) => format!("A {} already exists at ({}, {}).", o.kind, o.x, o.y),
        }
    }
}

/// Ordered list of placed objects
#[derive(Debug, Clone)]
pub struct MapAuthoringStore {
    catalog: Arc<AssetCatalog>,
    grid: EditorGrid,
    objects: Vec<MapObject>,
}

impl MapAuthoringStore {
    pub fn new(catalog: Arc<AssetCatalog>, grid: EditorGrid) -> Self {
        Self {
            catalog,
            grid,
            objects: Vec::new(),
        }
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Place an object of `kind` at the tile under (`raw_x`, `raw_y`).
    ///
    /// A spawn replaces any previous spawn. Other types are rejected as
    /// duplicates when the same type already occupies that tile.
    pub fn place(
        &mut self,
        kind: &str,
        raw_x: f32,
        raw_y: f32,
    ) -> Result<PlacementOutcome, EditorError> {
        let entry = self
            .catalog
            .find(kind)
            .ok_or_else(|| EditorError::UnknownType(kind.to_string()))?;
        if entry.kind == AssetCatalog::BACKGROUND {
            return Err(EditorError::NotPlaceable(kind.to_string()));
        }
        if !self.grid.contains(raw_x, raw_y) {
            return Err(EditorError::OutOfBounds { x: raw_x, y: raw_y });
        }

        let object = MapObject {
            kind: entry.kind.clone(),
            x: self.grid.snap(raw_x),
            y: self.grid.snap(raw_y),
            width: entry.default_size,
            height: entry.default_size,
        };

        if object.kind == AssetCatalog::SPAWN {
            self.objects.retain(|o| o.kind != AssetCatalog::SPAWN);
        } else if self
            .objects
            .iter()
            .any(|o| o.kind == object.kind && o.x == object.x && o.y == object.y)
        {
            debug!(kind = %object.kind, x = object.x, y = object.y, "Duplicate placement");
            return Ok(PlacementOutcome::Duplicate(object));
        }

        debug!(kind = %object.kind, x = object.x, y = object.y, "Object placed");
        self.objects.push(object.clone());
        Ok(PlacementOutcome::Placed(object))
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Objects for the map file: catalog types only, no background,
    /// ordered spawn → walls → everything else (stable within a group)
    pub fn export(&self) -> Vec<MapObject> {
        let mut exported: Vec<MapObject> = self
            .objects
            .iter()
            .filter(|o| {
                self.catalog.find(&o.kind).is_some() && o.kind != AssetCatalog::BACKGROUND
            })
            .cloned()
            .collect();
        exported.sort_by_key(|o| export_priority(&o.kind));
        exported
    }

    /// Pretty-printed map file contents
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export())
    }
}

fn export_priority(kind: &str) -> u8 {
    if kind == AssetCatalog::SPAWN {
        0
    } else if kind.starts_with("wall") {
        1
    } else {
        2
    }
}
