//! Screen-space draw lists sent to clients each frame

use serde::Serialize;
use std::sync::Arc;

use crate::map::catalog::{AssetCatalog, PLACEHOLDER_COLOR};

use super::camera::{is_visible, rect_to_screen};
use super::geometry::{Rect, Vec2, Viewport};
use super::input::{InputSnapshot, JoystickLayout};
use super::{Obstacle, PlayerState};

/// Everything a client needs to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameView {
    /// Whole world background
    pub world: Rect,
    /// World border outline (inset by one pixel)
    pub border: Rect,
    /// Map objects that touch the viewport, in map order
    pub sprites: Vec<Sprite>,
    /// Player box, always centered
    pub player: Rect,
    pub joystick: JoystickView,
    /// Debug text above the player
    pub label: String,
}

/// A map object placed on screen
#[derive(Debug, Clone, Serialize)]
pub struct Sprite {
    #[serde(rename = "type")]
    pub kind: String,
    pub rect: Rect,
    pub collidable: bool,
    /// Solid fill to draw instead of the image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<&'static str>,
}

/// On-screen joystick widget
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JoystickView {
    pub base: Vec2,
    pub base_radius: f32,
    pub knob: Vec2,
    pub knob_radius: f32,
}

/// Builds frame views for one session
pub struct FrameViewBuilder {
    catalog: Arc<AssetCatalog>,
    layout: JoystickLayout,
    world_size: f32,
    /// Frames built so far
    frames: u64,
}

impl FrameViewBuilder {
    pub fn new(catalog: Arc<AssetCatalog>, layout: JoystickLayout, world_size: f32) -> Self {
        Self {
            catalog,
            layout,
            world_size,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Build the draw list for `player` seen through `camera`
    pub fn build(
        &mut self,
        player: &PlayerState,
        camera: Vec2,
        viewport: Viewport,
        obstacles: &[Obstacle],
        input: &InputSnapshot,
    ) -> FrameView {
        self.frames += 1;

        let world = rect_to_screen(&Rect::new(0.0, 0.0, self.world_size, self.world_size), camera);
        let border = rect_to_screen(
            &Rect::new(1.0, 1.0, self.world_size - 2.0, self.world_size - 2.0),
            camera,
        );

        let sprites = obstacles
            .iter()
            .filter_map(|o| {
                let rect = rect_to_screen(&o.rect, camera);
                is_visible(&rect, viewport).then(|| Sprite {
                    kind: o.kind.clone(),
                    rect,
                    collidable: o.collidable,
                    fill: self
                        .catalog
                        .is_placeholder(&o.kind)
                        .then_some(PLACEHOLDER_COLOR),
                })
            })
            .collect();

        // Drawn at the center regardless of camera
        let player_rect = Rect::centered(viewport.center(), player.half_extents);

        let base = self.layout.anchor(viewport);
        let joystick = JoystickView {
            base,
            base_radius: self.layout.base_radius,
            knob: base + input.knob_offset,
            knob_radius: self.layout.knob_radius,
        };

        FrameView {
            world,
            border,
            sprites,
            player: player_rect,
            joystick,
            label: format!(
                "X:{} Y:{}",
                player.position.x.round(),
                player.position.y.round()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::camera::project;
    use crate::world::input::Direction;

    fn obstacle(kind: &str, x: f32, y: f32) -> Obstacle {
        Obstacle {
            kind: kind.to_string(),
            rect: Rect::new(x, y, 64.0, 64.0),
            collidable: kind.starts_with("wall"),
        }
    }

    fn builder() -> FrameViewBuilder {
        FrameViewBuilder::new(
            Arc::new(AssetCatalog::standard(64.0)),
            JoystickLayout::default(),
            3000.0,
        )
    }

    #[test]
    fn player_is_centered_and_world_is_offset() {
        let viewport = Viewport::new(800.0, 600.0);
        let player = PlayerState::new(Vec2::new(500.0, 500.0), 40.0, 40.0, 5.0);
        let camera = project(player.position, viewport);

        let view = builder().build(&player, camera, viewport, &[], &InputSnapshot::default());

        assert_eq!(view.player, Rect::new(380.0, 280.0, 40.0, 40.0));
        assert_eq!(view.world, Rect::new(-100.0, -200.0, 3000.0, 3000.0));
        assert_eq!(view.border, Rect::new(-99.0, -199.0, 2998.0, 2998.0));
        assert_eq!(view.label, "X:500 Y:500");
    }

    #[test]
    fn offscreen_obstacles_are_culled() {
        let viewport = Viewport::new(800.0, 600.0);
        let player = PlayerState::new(Vec2::new(500.0, 500.0), 40.0, 40.0, 5.0);
        let camera = project(player.position, viewport);
        let obstacles = [obstacle("wall_h", 400.0, 400.0), obstacle("tree_small", 2500.0, 2500.0)];

        let view = builder().build(&player, camera, viewport, &obstacles, &InputSnapshot::default());

        assert_eq!(view.sprites.len(), 1);
        assert_eq!(view.sprites[0].kind, "wall_h");
        assert_eq!(view.sprites[0].rect, Rect::new(300.0, 200.0, 64.0, 64.0));
        assert!(view.sprites[0].collidable);
    }

    #[test]
    fn unknown_types_get_placeholder_fill() {
        let viewport = Viewport::new(800.0, 600.0);
        let player = PlayerState::new(Vec2::new(500.0, 500.0), 40.0, 40.0, 5.0);
        let camera = project(player.position, viewport);
        let obstacles = [obstacle("boulder", 400.0, 400.0)];

        let view = builder().build(&player, camera, viewport, &obstacles, &InputSnapshot::default());

        assert_eq!(view.sprites[0].fill, Some("purple"));
    }

    #[test]
    fn knob_follows_input_offset() {
        let viewport = Viewport::new(800.0, 600.0);
        let player = PlayerState::new(Vec2::new(500.0, 500.0), 40.0, 40.0, 5.0);
        let input = InputSnapshot {
            direction: Direction::new(0.5, 0.0),
            knob_offset: Vec2::new(25.0, 0.0),
        };

        let mut b = builder();
        let view = b.build(&player, Vec2::ZERO, viewport, &[], &input);

        assert_eq!(view.joystick.base, Vec2::new(140.0, 460.0));
        assert_eq!(view.joystick.knob, Vec2::new(165.0, 460.0));
        assert_eq!(b.frames(), 1);
    }
}
