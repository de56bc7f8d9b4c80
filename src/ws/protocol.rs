//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::world::input::{InputEvent, Key};
use crate::world::view::FrameView;
use crate::world::{InputMode, Vec2, Viewport};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Client drawing surface changed size
    Resize { width: f32, height: f32 },

    /// Mouse button or touch began, screen pixels
    PointerDown { x: f32, y: f32 },

    /// Mouse or touch moved, screen pixels
    PointerMove { x: f32, y: f32 },

    /// Mouse button or touch ended
    PointerUp,

    /// Pointer left the drawing surface
    PointerLeave,

    /// Key pressed (browser `KeyboardEvent.key`)
    KeyDown { key: String },

    /// Key released
    KeyUp { key: String },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// End the session
    Leave,
}

impl ClientMsg {
    /// Decode the input part of this message, if it has one.
    /// Unknown key names decode to `None`.
    pub fn input_event(&self) -> Option<InputEvent> {
        match self {
            Self::PointerDown { x, y } => Some(InputEvent::PointerDown(Vec2::new(*x, *y))),
            Self::PointerMove { x, y } => Some(InputEvent::PointerMove(Vec2::new(*x, *y))),
            Self::PointerUp => Some(InputEvent::PointerUp),
            Self::PointerLeave => Some(InputEvent::PointerLeave),
            Self::KeyDown { key } => Key::from_name(key).map(InputEvent::KeyDown),
            Self::KeyUp { key } => Key::from_name(key).map(InputEvent::KeyUp),
            Self::Resize { .. } | Self::Ping { .. } | Self::Leave => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        session_id: Uuid,
        server_time: u64,
        /// Which input events the server listens to
        input_mode: InputMode,
        world_size: f32,
        /// Initial player position (world space)
        spawn: Vec2,
        /// Viewport assumed until the client sends `resize`
        viewport: Viewport,
    },

    /// One simulated frame
    Frame {
        tick: u64,
        /// Player world position after this frame
        position: Vec2,
        /// World → screen offset
        camera: Vec2,
        /// Screen-space draw list
        view: FrameView,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_messages_decode_to_events() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"pointer_down","x":140,"y":460}"#).unwrap();
        assert_eq!(
            msg.input_event(),
            Some(InputEvent::PointerDown(Vec2::new(140.0, 460.0)))
        );

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"pointer_leave"}"#).unwrap();
        assert_eq!(msg.input_event(), Some(InputEvent::PointerLeave));
    }

    #[test]
    fn unknown_keys_carry_no_event() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"key_down","key":"Escape"}"#).unwrap();
        assert_eq!(msg.input_event(), None);

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"key_up","key":"D"}"#).unwrap();
        assert_eq!(msg.input_event(), Some(InputEvent::KeyUp(Key::Right)));
    }

    #[test]
    fn server_messages_are_type_tagged() {
        let json = serde_json::to_value(ServerMsg::Pong { t: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "pong", "t": 7 }));
    }
}
