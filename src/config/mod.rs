//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::map::EditorGrid;
use crate::world::input::{InputMode, JoystickLayout};
use crate::world::{Vec2, Viewport};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Human-readable lines or one JSON object per event
    pub log_format: LogFormat,
    /// Allowed client origins for CORS ("*" for any)
    pub client_origin: String,

    /// Map file loaded at startup
    pub map_path: PathBuf,
    /// Directory holding the tile images
    pub asset_dir: PathBuf,
    /// Explicit collidable types; `None` derives them from the catalog
    pub collidable_types: Option<Vec<String>>,

    pub world: WorldConfig,
    pub joystick: JoystickLayout,
    pub editor: EditorGrid,
}

/// Output format of the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Gameplay parameters
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Side length of the square world
    pub world_size: f32,
    pub player_width: f32,
    pub player_height: f32,
    /// World units per frame
    pub player_speed: f32,
    /// Spawn when the map has none
    pub fallback_spawn: Vec2,
    pub frame_rate: u32,
    pub input_mode: InputMode,
    /// Viewport assumed before the client reports one
    pub default_viewport: Viewport,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render-style PORT wins over SERVER_ADDR
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let input_mode = match lookup("INPUT_MODE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "INPUT_MODE",
                value: raw,
            })?,
            None => InputMode::Joystick,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "LOG_FORMAT",
                value: raw,
            })?,
            None => LogFormat::Text,
        };

        let collidable_types = lookup("COLLIDABLE_TYPES").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        });

        let world = WorldConfig {
            world_size: parse_var(&lookup, "WORLD_SIZE", 3000.0)?,
            player_width: parse_var(&lookup, "PLAYER_WIDTH", 40.0)?,
            player_height: parse_var(&lookup, "PLAYER_HEIGHT", 40.0)?,
            player_speed: parse_var(&lookup, "PLAYER_SPEED", 5.0)?,
            fallback_spawn: Vec2::new(
                parse_var(&lookup, "PLAYER_SPAWN_X", 500.0)?,
                parse_var(&lookup, "PLAYER_SPAWN_Y", 500.0)?,
            ),
            frame_rate: parse_var(&lookup, "FRAME_RATE", 60)?,
            input_mode,
            default_viewport: Viewport::new(
                parse_var(&lookup, "VIEWPORT_WIDTH", 1280.0)?,
                parse_var(&lookup, "VIEWPORT_HEIGHT", 720.0)?,
            ),
        };

        let defaults = JoystickLayout::default();
        let joystick = JoystickLayout {
            margin: parse_var(&lookup, "JOYSTICK_MARGIN", defaults.margin)?,
            base_radius: parse_var(&lookup, "JOYSTICK_BASE_RADIUS", defaults.base_radius)?,
            limit: parse_var(&lookup, "JOYSTICK_LIMIT", defaults.limit)?,
            knob_radius: parse_var(&lookup, "JOYSTICK_KNOB_RADIUS", defaults.knob_radius)?,
        };

        let grid = EditorGrid::default();
        let editor = EditorGrid {
            tile_size: parse_var(&lookup, "EDITOR_TILE_SIZE", grid.tile_size)?,
            width: parse_var(&lookup, "EDITOR_WIDTH", grid.width)?,
            height: parse_var(&lookup, "EDITOR_HEIGHT", grid.height)?,
        };

        let config = Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            map_path: lookup("MAP_PATH")
                .unwrap_or_else(|| "maps/map_data.json".to_string())
                .into(),
            asset_dir: lookup("ASSET_DIR")
                .unwrap_or_else(|| "assets/images".to_string())
                .into(),
            collidable_types,
            world,
            joystick,
            editor,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.world;
        let positive: [(&'static str, f32); 7] = [
            ("WORLD_SIZE", w.world_size),
            ("PLAYER_WIDTH", w.player_width),
            ("PLAYER_HEIGHT", w.player_height),
            ("PLAYER_SPEED", w.player_speed),
            ("JOYSTICK_BASE_RADIUS", self.joystick.base_radius),
            ("JOYSTICK_LIMIT", self.joystick.limit),
            ("EDITOR_TILE_SIZE", self.editor.tile_size),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid {
                    name,
                    value: value.to_string(),
                });
            }
        }

        if w.frame_rate == 0 {
            return Err(ConfigError::Invalid {
                name: "FRAME_RATE",
                value: "0".to_string(),
            });
        }

        if w.world_size < w.player_width.max(w.player_height) {
            return Err(ConfigError::Invalid {
                name: "WORLD_SIZE",
                value: format!("{} (smaller than the player)", w.world_size),
            });
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_match_the_demo() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.world.world_size, 3000.0);
        assert_eq!(config.world.player_speed, 5.0);
        assert_eq!(config.world.frame_rate, 60);
        assert_eq!(config.world.input_mode, InputMode::Joystick);
        assert_eq!(config.joystick, JoystickLayout::default());
        assert!(config.collidable_types.is_none());
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = config_with(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn collidable_types_are_split_and_trimmed() {
        let config = config_with(&[("COLLIDABLE_TYPES", "wall_h, tree_large,,")]).unwrap();
        assert_eq!(
            config.collidable_types,
            Some(vec!["wall_h".to_string(), "tree_large".to_string()])
        );
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = config_with(&[("PLAYER_SPEED", "fast")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PLAYER_SPEED", .. }));

        let err = config_with(&[("WORLD_SIZE", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "WORLD_SIZE", .. }));
    }

    #[test]
    fn world_smaller_than_player_is_rejected() {
        let err = config_with(&[("WORLD_SIZE", "30")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "WORLD_SIZE", .. }));
    }

    #[test]
    fn keyboard_mode_is_selectable() {
        let config = config_with(&[("INPUT_MODE", "keyboard")]).unwrap();
        assert_eq!(config.world.input_mode, InputMode::Keyboard);
        assert!(config_with(&[("INPUT_MODE", "mind")]).is_err());
    }

    #[test]
    fn log_format_defaults_to_text() {
        assert_eq!(config_with(&[]).unwrap().log_format, LogFormat::Text);
        let config = config_with(&[("LOG_FORMAT", "JSON")]).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        let err = config_with(&[("LOG_FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "LOG_FORMAT", .. }));
    }

    #[test]
    fn bad_address_is_rejected() {
        let err = config_with(&[("SERVER_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress));
    }
}
