//! Frame simulation: input, movement, camera and per-frame views

pub mod camera;
pub mod geometry;
pub mod input;
pub mod session;
pub mod stepper;
pub mod view;

pub use geometry::{Rect, Vec2, Viewport};
pub use input::InputMode;
pub use session::{SessionRegistry, SessionSettings};
pub use stepper::WorldStepper;

use serde::Serialize;

/// A placed map rectangle as the frame loop sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstacle {
    /// Map object type (`wall_h`, `tree_small`, ...)
    pub kind: String,
    pub rect: Rect,
    /// Resolved from the collision table at load time
    pub collidable: bool,
}

/// The player of one session (authoritative)
#[derive(Debug, Clone, Copy)]
pub struct PlayerState {
    pub position: Vec2,
    pub half_extents: Vec2,
    /// World units per frame
    pub speed: f32,
}

impl PlayerState {
    pub fn new(position: Vec2, width: f32, height: f32, speed: f32) -> Self {
        Self {
            position,
            half_extents: Vec2::new(width / 2.0, height / 2.0),
            speed,
        }
    }
}
