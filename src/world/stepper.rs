//! Player movement, obstacle collision and world-bound clamping

use super::geometry::{Rect, Vec2};
use super::input::Direction;
use super::Obstacle;

/// Per-frame movement resolver for a single player box
///
/// Collision is resolved one axis at a time, X before Y. A diagonal move
/// into a corner therefore slides along the obstacle instead of stopping
/// dead.
#[derive(Debug, Clone, Copy)]
pub struct WorldStepper {
    /// Side length of the square world
    world_size: f32,
    /// Half width / half height of the player box
    half_extents: Vec2,
}

impl WorldStepper {
    pub fn new(world_size: f32, half_extents: Vec2) -> Self {
        Self {
            world_size,
            half_extents,
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    /// Advance `position` by `direction * speed`, blocking moves into
    /// collidable obstacles and clamping into the world.
    pub fn step(
        &self,
        position: Vec2,
        direction: Direction,
        speed: f32,
        obstacles: &[Obstacle],
    ) -> Vec2 {
        let desired = Vec2::new(
            position.x + direction.x * speed,
            position.y + direction.y * speed,
        );
        let resolved = self.resolve_axes(position, desired, obstacles);
        self.clamp(resolved)
    }

    /// Two-phase collision resolution.
    ///
    /// Phase 1 tests (desired.x, position.y). Phase 2 tests
    /// (resolved x, desired.y). An axis whose test overlaps keeps its old
    /// coordinate.
    fn resolve_axes(&self, position: Vec2, desired: Vec2, obstacles: &[Obstacle]) -> Vec2 {
        let x = if self.is_blocked(Vec2::new(desired.x, position.y), obstacles) {
            position.x
        } else {
            desired.x
        };

        let y = if self.is_blocked(Vec2::new(x, desired.y), obstacles) {
            position.y
        } else {
            desired.y
        };

        Vec2::new(x, y)
    }

    /// Check whether a player box centered at `center` overlaps any collidable obstacle
    pub fn is_blocked(&self, center: Vec2, obstacles: &[Obstacle]) -> bool {
        let body = Rect::centered(center, self.half_extents);
        obstacles
            .iter()
            .filter(|o| o.collidable)
            .any(|o| body.intersects(&o.rect))
    }

    /// Keep the player box inside `[0, world_size]` on both axes
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            clamp_axis(position.x, self.half_extents.x, self.world_size),
            clamp_axis(position.y, self.half_extents.y, self.world_size),
        )
    }
}

// max(half, min(v, extent - half)); f32::clamp would panic when the world is
// smaller than the box.
fn clamp_axis(value: f32, half: f32, extent: f32) -> f32 {
    value.min(extent - half).max(half)
}
