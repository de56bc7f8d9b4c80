//! WebSocket session transport

pub mod handler;
pub mod protocol;
