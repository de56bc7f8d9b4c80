//! Input sampling: raw pointer/key events to a direction vector
//!
//! Two strategies exist and a build uses exactly one of them:
//! - keyboard: four held keys, each axis in {-1, 0, 1}
//! - virtual joystick: pointer displacement from a fixed anchor, inside the unit disk
//!
//! The sampler lives in the connection's reader task. After every event it
//! produces a complete [`InputSnapshot`] that the frame loop reads once per
//! frame.

use serde::{Deserialize, Serialize};

use super::geometry::{Vec2, Viewport};

/// Normalized movement intent, each component in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub x: f32,
    pub y: f32,
}

impl Direction {
    pub const ZERO: Direction = Direction { x: 0.0, y: 0.0 };

    /// Components are clamped into [-1, 1]; NaN becomes 0.
    pub fn new(x: f32, y: f32) -> Self {
        let axis = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        Self {
            x: axis(x),
            y: axis(y),
        }
    }

    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Which sampler a server instance uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Keyboard,
    Joystick,
}

impl std::str::FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyboard" | "keys" | "wasd" => Ok(Self::Keyboard),
            "joystick" | "touch" => Ok(Self::Joystick),
            other => Err(format!("unknown input mode '{}'", other)),
        }
    }
}

/// Raw input events, already decoded from the wire
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown(Vec2),
    PointerMove(Vec2),
    PointerUp,
    PointerLeave,
    KeyDown(Key),
    KeyUp(Key),
}

/// Movement keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Map a browser key name; `w`/`a`/`s`/`d` in any case plus the arrows
    pub fn from_name(name: &str) -> Option<Key> {
        match name.to_ascii_lowercase().as_str() {
            "w" | "arrowup" => Some(Key::Up),
            "s" | "arrowdown" => Some(Key::Down),
            "a" | "arrowleft" => Some(Key::Left),
            "d" | "arrowright" => Some(Key::Right),
            _ => None,
        }
    }
}

/// What the frame loop reads each frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub direction: Direction,
    /// Knob offset from the joystick anchor, in screen pixels
    pub knob_offset: Vec2,
}

/// Held-key state for the keyboard strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl KeyboardInput {
    pub fn set(&mut self, key: Key, pressed: bool) {
        match key {
            Key::Up => self.up = pressed,
            Key::Down => self.down = pressed,
            Key::Left => self.left = pressed,
            Key::Right => self.right = pressed,
        }
    }

    /// Sign combination of the held keys.
    ///
    /// Diagonals are (±1, ±1), i.e. √2 faster than a straight move. Clients
    /// depend on this, so it is not normalized.
    pub fn direction(&self) -> Direction {
        let axis = |neg: bool, pos: bool| f32::from(u8::from(pos)) - f32::from(u8::from(neg));
        Direction::new(axis(self.left, self.right), axis(self.up, self.down))
    }
}

/// Screen layout of the virtual joystick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickLayout {
    /// Distance of the base circle from the left and bottom edges
    pub margin: f32,
    /// Radius of the base circle; also the activation gate
    pub base_radius: f32,
    /// Maximum knob travel; displacement is divided by this
    pub limit: f32,
    pub knob_radius: f32,
}

impl Default for JoystickLayout {
    fn default() -> Self {
        Self {
            margin: 50.0,
            base_radius: 90.0,
            limit: 50.0,
            knob_radius: 30.0,
        }
    }
}

impl JoystickLayout {
    /// Base circle center, bottom-left of the viewport
    pub fn anchor(&self, viewport: Viewport) -> Vec2 {
        let inset = self.margin + self.base_radius;
        Vec2::new(inset, viewport.height - inset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickPhase {
    Idle,
    Active,
}

/// Virtual joystick state machine
#[derive(Debug, Clone)]
pub struct Joystick {
    layout: JoystickLayout,
    anchor: Vec2,
    phase: JoystickPhase,
    knob_offset: Vec2,
    direction: Direction,
}

impl Joystick {
    pub fn new(layout: JoystickLayout, viewport: Viewport) -> Self {
        Self {
            layout,
            anchor: layout.anchor(viewport),
            phase: JoystickPhase::Idle,
            knob_offset: Vec2::ZERO,
            direction: Direction::ZERO,
        }
    }

    pub fn phase(&self) -> JoystickPhase {
        self.phase
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn knob_offset(&self) -> Vec2 {
        self.knob_offset
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.anchor = self.layout.anchor(viewport);
    }

    /// Pointer pressed. Activates only inside the base circle; an already
    /// active stick just tracks the new point.
    pub fn pointer_down(&mut self, at: Vec2) {
        if self.phase == JoystickPhase::Idle {
            if (at - self.anchor).length() > self.layout.base_radius {
                return;
            }
            self.phase = JoystickPhase::Active;
        }
        self.track(at);
    }

    pub fn pointer_move(&mut self, at: Vec2) {
        if self.phase == JoystickPhase::Active {
            self.track(at);
        }
    }

    /// Pointer released or left the surface
    pub fn release(&mut self) {
        self.phase = JoystickPhase::Idle;
        self.knob_offset = Vec2::ZERO;
        self.direction = Direction::ZERO;
    }

    fn track(&mut self, at: Vec2) {
        let mut delta = at - self.anchor;
        let magnitude = delta.length();
        if magnitude > self.layout.limit {
            delta = delta.scale(self.layout.limit / magnitude);
        }
        self.knob_offset = delta;
        self.direction = Direction::new(delta.x / self.layout.limit, delta.y / self.layout.limit);
    }
}

/// The configured input strategy for one connection
#[derive(Debug, Clone)]
pub enum InputSampler {
    Keyboard(KeyboardInput),
    Joystick(Joystick),
}

impl InputSampler {
    pub fn new(mode: InputMode, layout: JoystickLayout, viewport: Viewport) -> Self {
        match mode {
            InputMode::Keyboard => Self::Keyboard(KeyboardInput::default()),
            InputMode::Joystick => Self::Joystick(Joystick::new(layout, viewport)),
        }
    }

    pub fn mode(&self) -> InputMode {
        match self {
            Self::Keyboard(_) => InputMode::Keyboard,
            Self::Joystick(_) => InputMode::Joystick,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if let Self::Joystick(stick) = self {
            stick.set_viewport(viewport);
        }
    }

    /// Apply one event. Returns false if the event belongs to the other strategy.
    pub fn handle(&mut self, event: InputEvent) -> bool {
        match (self, event) {
            (Self::Keyboard(keys), InputEvent::KeyDown(key)) => keys.set(key, true),
            (Self::Keyboard(keys), InputEvent::KeyUp(key)) => keys.set(key, false),
            (Self::Joystick(stick), InputEvent::PointerDown(at)) => stick.pointer_down(at),
            (Self::Joystick(stick), InputEvent::PointerMove(at)) => stick.pointer_move(at),
            (Self::Joystick(stick), InputEvent::PointerUp | InputEvent::PointerLeave) => {
                stick.release()
            }
            _ => return false,
        }
        true
    }

    /// Complete snapshot for the frame loop
    pub fn snapshot(&self, layout: &JoystickLayout) -> InputSnapshot {
        match self {
            Self::Keyboard(keys) => {
                let direction = keys.direction();
                InputSnapshot {
                    direction,
                    knob_offset: Vec2::new(direction.x, direction.y).scale(layout.knob_radius),
                }
            }
            Self::Joystick(stick) => InputSnapshot {
                direction: stick.direction(),
                knob_offset: stick.knob_offset(),
            },
        }
    }
}
