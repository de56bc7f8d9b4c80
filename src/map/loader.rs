//! Map file parsing and the loaded world

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::world::{Obstacle, Rect, Vec2};

use super::catalog::{AssetCatalog, CollisionTable};

/// One record of the map file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl MapObject {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Map loading errors (fatal at startup)
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Failed to read map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse map file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The loaded, read-only map shared by every session
#[derive(Debug, Clone, Default)]
pub struct WorldMap {
    /// Records as they appear in the file
    objects: Vec<MapObject>,
    /// Same records with collidability resolved
    obstacles: Vec<Obstacle>,
    /// Center of the first `spawn` record
    spawn: Option<Vec2>,
}

impl WorldMap {
    /// Read and parse a map file
    pub async fn load(path: &Path, table: &CollisionTable) -> Result<Self, MapError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| MapError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let map = Self::from_json(&text, table).map_err(|source| MapError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            path = %path.display(),
            objects = map.objects.len(),
            collidable = map.collidable_count(),
            has_spawn = map.spawn.is_some(),
            "Map loaded"
        );

        Ok(map)
    }

    pub fn from_json(text: &str, table: &CollisionTable) -> Result<Self, serde_json::Error> {
        let objects: Vec<MapObject> = serde_json::from_str(text)?;
        Ok(Self::from_objects(objects, table))
    }

    /// Values are taken as-is; negative sizes are not rejected.
    pub fn from_objects(objects: Vec<MapObject>, table: &CollisionTable) -> Self {
        let obstacles = objects
            .iter()
            .map(|o| Obstacle {
                kind: o.kind.clone(),
                rect: o.rect(),
                collidable: table.is_collidable(&o.kind),
            })
            .collect();

        let spawn = objects
            .iter()
            .find(|o| o.kind == AssetCatalog::SPAWN)
            .map(|o| o.rect().center());

        Self {
            objects,
            obstacles,
            spawn,
        }
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn spawn(&self) -> Option<Vec2> {
        self.spawn
    }

    pub fn spawn_or(&self, fallback: Vec2) -> Vec2 {
        self.spawn.unwrap_or(fallback)
    }

    pub fn collidable_count(&self) -> usize {
        self.obstacles.iter().filter(|o| o.collidable).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CollisionTable {
        CollisionTable::from_catalog(&AssetCatalog::standard(64.0))
    }

    const SAMPLE: &str = r#"[
        { "type": "spawn", "x": 128, "y": 192, "width": 64, "height": 64 },
        { "type": "wall_h", "x": 100, "y": 100, "width": 64, "height": 64 },
        { "type": "tree_large", "x": 640, "y": 320, "width": 128, "height": 128 }
    ]"#;

    #[test]
    fn spawn_is_center_of_spawn_record() {
        let map = WorldMap::from_json(SAMPLE, &table()).unwrap();
        assert_eq!(map.spawn(), Some(Vec2::new(160.0, 224.0)));
    }

    #[test]
    fn collidability_comes_from_table() {
        let map = WorldMap::from_json(SAMPLE, &table()).unwrap();
        let flags: Vec<(&str, bool)> = map
            .obstacles()
            .iter()
            .map(|o| (o.kind.as_str(), o.collidable))
            .collect();
        assert_eq!(
            flags,
            vec![("spawn", false), ("wall_h", true), ("tree_large", false)]
        );
        assert_eq!(map.collidable_count(), 1);
    }

    #[test]
    fn missing_spawn_uses_fallback() {
        let map = WorldMap::from_json("[]", &table()).unwrap();
        assert_eq!(map.spawn_or(Vec2::new(500.0, 500.0)), Vec2::new(500.0, 500.0));
        assert!(map.obstacles().is_empty());
    }

    #[test]
    fn negative_sizes_are_kept_verbatim() {
        let json = r#"[{ "type": "wall_v", "x": 10, "y": 10, "width": -5, "height": 20 }]"#;
        let map = WorldMap::from_json(json, &table()).unwrap();
        assert_eq!(map.obstacles()[0].rect, Rect::new(10.0, 10.0, -5.0, 20.0));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let json = r#"[{ "type": "wall_v", "x": 10, "y": 10 }]"#;
        assert!(WorldMap::from_json(json, &table()).is_err());
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let path = std::env::temp_dir().join(format!("no-such-map-{}.json", uuid::Uuid::new_v4()));
        let err = tokio_test::assert_err!(WorldMap::load(&path, &table()).await);
        assert!(matches!(err, MapError::Io { .. }));
    }

    #[tokio::test]
    async fn load_reports_malformed_json() {
        let path = std::env::temp_dir().join(format!("bad-map-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = WorldMap::load(&path, &table()).await.unwrap_err();
        assert!(matches!(err, MapError::Parse { .. }));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("map-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let map = tokio_test::assert_ok!(WorldMap::load(&path, &table()).await);
        assert_eq!(map.objects().len(), 3);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn bundled_map_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("maps/map_data.json");
        let map = tokio_test::assert_ok!(WorldMap::load(&path, &table()).await);

        assert!(map.spawn().is_some());
        assert!(map.collidable_count() > 0);
    }
}
