//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::world::input::{InputEvent, InputSampler, InputSnapshot, JoystickLayout};
use crate::world::session::SessionCommand;
use crate::world::Viewport;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let settings = &state.session_settings;
    let channels = state
        .sessions
        .start(state.world.clone(), state.catalog.clone(), settings);
    let session_id = channels.handle.id;

    info!(session_id = %session_id, input_mode = ?settings.input_mode, "New WebSocket connection");

    let welcome = ServerMsg::Welcome {
        session_id,
        server_time: unix_millis(),
        input_mode: settings.input_mode,
        world_size: settings.stepper.world_size(),
        spawn: settings.spawn_point(&state.world),
        viewport: settings.default_viewport,
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session_id = %session_id, error = %e, "Failed to send welcome");
        let _ = channels.handle.command_tx.send(SessionCommand::Stop).await;
        return;
    }

    let relay = InputRelay::new(
        InputSampler::new(settings.input_mode, settings.joystick, settings.default_viewport),
        settings.joystick,
        channels.input_tx,
    );

    run_session(
        session_id,
        ws_sink,
        ws_stream,
        relay,
        channels.handle.command_tx,
        channels.handle.frame_tx,
        channels.frame_rx,
    )
    .await;

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut relay: InputRelay,
    command_tx: mpsc::Sender<SessionCommand>,
    frame_tx: broadcast::Sender<ServerMsg>,
    mut frame_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: frames -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match frame_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %session_id,
                        lagged_count = n,
                        "Client lagged, skipping {} frames", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %session_id, "Frame channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> sampler / frame loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(session_id = %session_id, "Rate limited input message");
                    continue;
                }

                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                        let _ = frame_tx.send(ServerMsg::Error {
                            code: "bad_message".to_string(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                let command = match client_msg {
                    ClientMsg::Leave => {
                        info!(session_id = %session_id, "Client left");
                        break;
                    }
                    ClientMsg::Ping { t } => Some(SessionCommand::Ping(t)),
                    ClientMsg::Resize { width, height } => {
                        relay.resize(session_id, Viewport::new(width, height))
                    }
                    other => {
                        relay.apply(session_id, &other);
                        None
                    }
                };

                if let Some(command) = command {
                    if command_tx.send(command).await.is_err() {
                        debug!(session_id = %session_id, "Session command channel closed");
                        break;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(session_id = %session_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(session_id = %session_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Stop requesting frames
    let _ = command_tx.send(SessionCommand::Stop).await;

    // Abort writer task
    writer_handle.abort();
}

/// Owns the connection's input sampler and publishes complete snapshots
pub struct InputRelay {
    sampler: InputSampler,
    layout: JoystickLayout,
    input_tx: watch::Sender<InputSnapshot>,
}

impl InputRelay {
    pub fn new(
        sampler: InputSampler,
        layout: JoystickLayout,
        input_tx: watch::Sender<InputSnapshot>,
    ) -> Self {
        Self {
            sampler,
            layout,
            input_tx,
        }
    }

    /// Feed one input message to the sampler. The snapshot is replaced as a
    /// whole, so the frame loop never reads a half-updated direction.
    pub fn apply(&mut self, session_id: Uuid, msg: &ClientMsg) {
        let Some(event) = msg.input_event() else {
            debug!(session_id = %session_id, ?msg, "Message carries no input event");
            return;
        };

        if let InputEvent::PointerDown(at) | InputEvent::PointerMove(at) = event {
            if !at.is_finite() {
                warn!(session_id = %session_id, x = at.x, y = at.y, "Ignoring non-finite pointer");
                return;
            }
        }

        if self.sampler.handle(event) {
            self.publish();
        } else {
            debug!(
                session_id = %session_id,
                input_mode = ?self.sampler.mode(),
                "Event ignored by current input mode"
            );
        }
    }

    /// Move the joystick anchor and forward the new viewport to the frame loop
    pub fn resize(&mut self, session_id: Uuid, viewport: Viewport) -> Option<SessionCommand> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(viewport.width) || !valid(viewport.height) {
            warn!(
                session_id = %session_id,
                width = viewport.width,
                height = viewport.height,
                "Ignoring invalid viewport"
            );
            return None;
        }

        self.sampler.set_viewport(viewport);
        Some(SessionCommand::Resize(viewport))
    }

    fn publish(&self) {
        self.input_tx.send_replace(self.sampler.snapshot(&self.layout));
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::map::{AssetCatalog, CollisionTable, WorldMap};
    use crate::world::input::{Direction, InputMode};
    use crate::world::session::{GameSession, SessionSettings};
    use crate::world::{Vec2, WorldStepper};

    fn relay(mode: InputMode) -> (InputRelay, watch::Receiver<InputSnapshot>) {
        let layout = JoystickLayout::default();
        let (tx, rx) = watch::channel(InputSnapshot::default());
        let sampler = InputSampler::new(mode, layout, Viewport::new(800.0, 600.0));
        (InputRelay::new(sampler, layout, tx), rx)
    }

    #[test]
    fn pointer_drag_publishes_direction() {
        let (mut relay, rx) = relay(InputMode::Joystick);
        let id = Uuid::new_v4();

        relay.apply(id, &ClientMsg::PointerDown { x: 140.0, y: 460.0 });
        relay.apply(id, &ClientMsg::PointerMove { x: 240.0, y: 460.0 });
        assert_eq!(rx.borrow().direction, Direction::new(1.0, 0.0));
        assert_eq!(rx.borrow().knob_offset, Vec2::new(50.0, 0.0));

        relay.apply(id, &ClientMsg::PointerUp);
        assert_eq!(*rx.borrow(), InputSnapshot::default());
    }

    #[test]
    fn resize_moves_anchor_before_next_press() {
        let (mut relay, rx) = relay(InputMode::Joystick);
        let id = Uuid::new_v4();

        let cmd = relay.resize(id, Viewport::new(800.0, 1000.0));
        assert!(matches!(cmd, Some(SessionCommand::Resize(_))));

        // Old anchor (140, 460) is now far outside the base circle
        relay.apply(id, &ClientMsg::PointerDown { x: 140.0, y: 460.0 });
        assert_eq!(rx.borrow().direction, Direction::ZERO);

        relay.apply(id, &ClientMsg::PointerDown { x: 140.0, y: 870.0 });
        assert_eq!(rx.borrow().direction, Direction::new(0.0, 0.2));
    }

    #[test]
    fn overflowing_pointer_is_dropped() {
        let (mut relay, rx) = relay(InputMode::Joystick);
        let id = Uuid::new_v4();
        relay.apply(id, &ClientMsg::PointerDown { x: 140.0, y: 460.0 });

        // 1e39 does not fit in an f32 and decodes to infinity
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"pointer_move","x":1e39,"y":460}"#).unwrap();
        relay.apply(id, &msg);

        let snapshot = *rx.borrow();
        assert_eq!(snapshot.direction, Direction::ZERO);
        assert!(snapshot.knob_offset.is_finite());
    }

    #[test]
    fn overflowing_pointer_cannot_cross_a_wall() {
        let catalog = AssetCatalog::standard(64.0);
        let map = r#"[{ "type": "wall_v", "x": 600, "y": 0, "width": 64, "height": 3000 }]"#;
        let world = WorldMap::from_json(map, &CollisionTable::from_catalog(&catalog)).unwrap();
        let settings = SessionSettings {
            stepper: WorldStepper::new(3000.0, Vec2::new(20.0, 20.0)),
            player_speed: 5.0,
            fallback_spawn: Vec2::new(500.0, 500.0),
            frame_rate: 60,
            input_mode: InputMode::Joystick,
            joystick: JoystickLayout::default(),
            default_viewport: Viewport::new(800.0, 600.0),
        };
        let (mut session, channels) =
            GameSession::new(Uuid::new_v4(), Arc::new(world), Arc::new(catalog), &settings);

        let sampler = InputSampler::new(
            settings.input_mode,
            settings.joystick,
            settings.default_viewport,
        );
        let mut relay = InputRelay::new(sampler, settings.joystick, channels.input_tx);
        let id = Uuid::new_v4();
        relay.apply(id, &ClientMsg::PointerDown { x: 140.0, y: 460.0 });
        relay.apply(id, &ClientMsg::PointerMove { x: f32::INFINITY, y: 460.0 });

        for _ in 0..100 {
            if let ServerMsg::Frame { position, .. } = session.run_frame() {
                assert!(position.x + 20.0 <= 600.0, "{position:?}");
            }
        }
    }

    #[test]
    fn invalid_viewport_is_ignored() {
        let (mut relay, _rx) = relay(InputMode::Joystick);
        assert!(relay.resize(Uuid::new_v4(), Viewport::new(0.0, 600.0)).is_none());
    }

    #[test]
    fn keyboard_relay_ignores_pointer() {
        let (mut relay, rx) = relay(InputMode::Keyboard);
        let id = Uuid::new_v4();

        relay.apply(id, &ClientMsg::PointerDown { x: 140.0, y: 460.0 });
        assert_eq!(rx.borrow().direction, Direction::ZERO);

        relay.apply(id, &ClientMsg::KeyDown { key: "a".to_string() });
        relay.apply(id, &ClientMsg::KeyDown { key: "S".to_string() });
        assert_eq!(rx.borrow().direction, Direction::new(-1.0, 1.0));

        relay.apply(id, &ClientMsg::KeyUp { key: "a".to_string() });
        assert_eq!(rx.borrow().direction, Direction::new(0.0, 1.0));
    }
}
