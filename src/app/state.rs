//! Application state shared across routes

use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::Config;
use crate::map::{AssetCatalog, CollisionTable, MapAuthoringStore, WorldMap};
use crate::world::{SessionRegistry, SessionSettings, Vec2, WorldStepper};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<AssetCatalog>,
    /// Map loaded at startup (read-only)
    pub world: Arc<WorldMap>,
    pub session_settings: Arc<SessionSettings>,
    pub sessions: Arc<SessionRegistry>,
    pub editor: Arc<Mutex<MapAuthoringStore>>,
}

impl AppState {
    pub fn new(config: Config, catalog: AssetCatalog, world: WorldMap) -> Self {
        let config = Arc::new(config);
        let catalog = Arc::new(catalog);

        let session_settings = Arc::new(session_settings(&config));

        // Editor starts empty; exports are downloaded, never written back
        let editor = Arc::new(Mutex::new(MapAuthoringStore::new(
            catalog.clone(),
            config.editor,
        )));

        Self {
            config,
            catalog,
            world: Arc::new(world),
            session_settings,
            sessions: Arc::new(SessionRegistry::new()),
            editor,
        }
    }
}

/// Collision table: explicit `COLLIDABLE_TYPES` or the catalog's wall category
pub fn collision_table(config: &Config, catalog: &AssetCatalog) -> CollisionTable {
    match &config.collidable_types {
        Some(types) => CollisionTable::from_types(types.iter().cloned()),
        None => CollisionTable::from_catalog(catalog),
    }
}

pub fn session_settings(config: &Config) -> SessionSettings {
    let w = &config.world;
    SessionSettings {
        stepper: WorldStepper::new(
            w.world_size,
            Vec2::new(w.player_width / 2.0, w.player_height / 2.0),
        ),
        player_speed: w.player_speed,
        fallback_spawn: w.fallback_spawn,
        frame_rate: w.frame_rate,
        input_mode: w.input_mode,
        joystick: config.joystick,
        default_viewport: w.default_viewport,
    }
}
