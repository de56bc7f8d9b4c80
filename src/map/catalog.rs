//! Asset catalog and the type → collidable lookup

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Fill color used when an object's image is unavailable
pub const PLACEHOLDER_COLOR: &str = "purple";

/// Broad grouping of map object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    /// Ground tiles (never exported)
    Tile,
    /// Fences and walls
    Wall,
    /// Trees and other scenery
    Decoration,
    /// Spawn marker
    Special,
}

/// One entry of the catalog
#[derive(Debug, Clone, Serialize)]
pub struct AssetEntry {
    #[serde(rename = "type")]
    pub kind: String,
    /// Image file name, relative to the asset directory
    pub image: String,
    pub category: AssetCategory,
    /// Width and height of a freshly placed object
    pub default_size: f32,
}

impl AssetEntry {
    fn new(kind: &str, image: &str, category: AssetCategory, default_size: f32) -> Self {
        Self {
            kind: kind.to_string(),
            image: image.to_string(),
            category,
            default_size,
        }
    }
}

/// All known map object types
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    entries: Vec<AssetEntry>,
    /// Types whose image could not be found
    missing_images: HashSet<String>,
}

impl AssetCatalog {
    pub const BACKGROUND: &'static str = "background";
    pub const SPAWN: &'static str = "spawn";

    /// The stock tile set; `tile` is the grid size (large trees span 2x2)
    pub fn standard(tile: f32) -> Self {
        use AssetCategory::*;
        Self {
            entries: vec![
                AssetEntry::new(Self::BACKGROUND, "tile_grass.png", Tile, tile),
                AssetEntry::new("wall_h", "Wooden_Fence_Horizontal.png", Wall, tile),
                AssetEntry::new("wall_v", "Wooden_Fence_Vertical.png", Wall, tile),
                AssetEntry::new("tree_small", "Tree_Small.png", Decoration, tile),
                AssetEntry::new("tree_medium", "Tree_Medium.png", Decoration, tile),
                AssetEntry::new("tree_large", "Tree_Large.png", Decoration, tile * 2.0),
                AssetEntry::new(Self::SPAWN, "tile_spawn.png", Special, tile),
            ],
            missing_images: HashSet::new(),
        }
    }

    pub fn find(&self, kind: &str) -> Option<&AssetEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn entries(&self) -> &[AssetEntry] {
        &self.entries
    }

    /// Types the editor may place (the background tile is implicit)
    pub fn placeable(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.iter().filter(|e| e.kind != Self::BACKGROUND)
    }

    /// Check every image under `dir`. Missing files are logged and drawn as
    /// placeholders; they never stop startup.
    pub async fn probe(&mut self, dir: &Path) {
        let mut found = 0usize;
        for entry in &self.entries {
            let path = dir.join(&entry.image);
            if tokio::fs::metadata(&path).await.is_ok() {
                found += 1;
            } else {
                warn!(
                    asset_type = %entry.kind,
                    path = %path.display(),
                    "Image not found, drawing placeholder"
                );
                self.missing_images.insert(entry.kind.clone());
            }
        }
        info!(found, total = self.entries.len(), "Asset images probed");
    }

    /// True if objects of this type should be drawn as a solid placeholder
    pub fn is_placeholder(&self, kind: &str) -> bool {
        self.find(kind).is_none() || self.missing_images.contains(kind)
    }
}

/// Which map object types block movement
#[derive(Debug, Clone, Default)]
pub struct CollisionTable {
    collidable: HashSet<String>,
}

impl CollisionTable {
    /// Every `wall` category type collides
    pub fn from_catalog(catalog: &AssetCatalog) -> Self {
        Self {
            collidable: catalog
                .entries()
                .iter()
                .filter(|e| e.category == AssetCategory::Wall)
                .map(|e| e.kind.clone())
                .collect(),
        }
    }

    /// Explicit list, e.g. from `COLLIDABLE_TYPES`
    pub fn from_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collidable: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_collidable(&self, kind: &str) -> bool {
        self.collidable.contains(kind)
    }

    pub fn len(&self) -> usize {
        self.collidable.len()
    }
}
