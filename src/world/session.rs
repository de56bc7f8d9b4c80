//! Per-connection session state and the frame loop

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use crate::map::{AssetCatalog, WorldMap};
use crate::ws::protocol::ServerMsg;

use super::camera::project;
use super::geometry::{Vec2, Viewport};
use super::input::{InputMode, InputSnapshot, JoystickLayout};
use super::stepper::WorldStepper;
use super::view::FrameViewBuilder;
use super::PlayerState;

/// Session parameters shared by every connection
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub stepper: WorldStepper,
    /// World units per frame
    pub player_speed: f32,
    /// Used when the map has no spawn record
    pub fallback_spawn: Vec2,
    pub frame_rate: u32,
    pub input_mode: InputMode,
    pub joystick: JoystickLayout,
    /// Viewport assumed until the client reports its own
    pub default_viewport: Viewport,
}

impl SessionSettings {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frame_rate.max(1)))
    }

    /// Spawn point for `world`, clamped into the world bounds
    pub fn spawn_point(&self, world: &WorldMap) -> Vec2 {
        self.stepper.clamp(world.spawn_or(self.fallback_spawn))
    }
}

/// Control messages from the connection to its frame loop
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Resize(Viewport),
    Ping(u64),
    /// Stop requesting frames
    Stop,
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub command_tx: mpsc::Sender<SessionCommand>,
    pub frame_tx: broadcast::Sender<ServerMsg>,
    pub frames: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

/// Everything a connection needs to talk to its session
pub struct SessionChannels {
    pub handle: SessionHandle,
    /// Input side of the direction snapshot (single writer)
    pub input_tx: watch::Sender<InputSnapshot>,
    pub frame_rx: broadcast::Receiver<ServerMsg>,
}

/// Registry of all running sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn total_frames(&self) -> u64 {
        self.sessions.iter().map(|s| s.value().frames()).sum()
    }

    /// Create a session, register it and spawn its frame loop.
    /// The session removes itself from the registry when the loop ends.
    pub fn start(
        self: &Arc<Self>,
        world: Arc<WorldMap>,
        catalog: Arc<AssetCatalog>,
        settings: &SessionSettings,
    ) -> SessionChannels {
        let id = Uuid::new_v4();
        let (session, channels) = GameSession::new(id, world, catalog, settings);

        self.insert(channels.handle.clone());

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            session.run().await;
            registry.remove(&id);
            debug!(session_id = %id, "Session removed from registry");
        });

        channels
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One player's authoritative frame loop
pub struct GameSession {
    id: Uuid,
    player: PlayerState,
    viewport: Viewport,
    tick: u64,
    world: Arc<WorldMap>,
    stepper: WorldStepper,
    frame_duration: Duration,
    command_rx: mpsc::Receiver<SessionCommand>,
    input_rx: watch::Receiver<InputSnapshot>,
    frame_tx: broadcast::Sender<ServerMsg>,
    view_builder: FrameViewBuilder,
    frames: Arc<AtomicU64>,
}

impl GameSession {
    pub fn new(
        id: Uuid,
        world: Arc<WorldMap>,
        catalog: Arc<AssetCatalog>,
        settings: &SessionSettings,
    ) -> (Self, SessionChannels) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (input_tx, input_rx) = watch::channel(InputSnapshot::default());
        let (frame_tx, frame_rx) = broadcast::channel(64);
        let frames = Arc::new(AtomicU64::new(0));

        let half = settings.stepper.half_extents();
        let player = PlayerState::new(
            settings.spawn_point(&world),
            half.x * 2.0,
            half.y * 2.0,
            settings.player_speed,
        );

        let handle = SessionHandle {
            id,
            command_tx,
            frame_tx: frame_tx.clone(),
            frames: frames.clone(),
        };

        let session = Self {
            id,
            player,
            viewport: settings.default_viewport,
            tick: 0,
            world,
            stepper: settings.stepper,
            frame_duration: settings.frame_duration(),
            command_rx,
            input_rx,
            frame_tx,
            view_builder: FrameViewBuilder::new(
                catalog,
                settings.joystick,
                settings.stepper.world_size(),
            ),
            frames,
        };

        (
            session,
            SessionChannels {
                handle,
                input_tx,
                frame_rx,
            },
        )
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Run the frame loop until the client leaves
    pub async fn run(mut self) {
        info!(
            session_id = %self.id,
            spawn_x = self.player.position.x,
            spawn_y = self.player.position.y,
            "Session started"
        );

        let mut frame_interval = interval(self.frame_duration);
        frame_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            frame_interval.tick().await;

            if !self.process_commands() {
                break;
            }

            let frame = self.run_frame();

            // No receivers just means the writer is gone; the Stop follows
            let _ = self.frame_tx.send(frame);
        }

        info!(
            session_id = %self.id,
            frames = self.view_builder.frames(),
            "Session ended"
        );
    }

    /// Drain pending commands. Returns false once the session should stop.
    fn process_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(SessionCommand::Resize(viewport)) => {
                    debug!(session_id = %self.id, width = viewport.width, height = viewport.height, "Viewport resized");
                    self.viewport = viewport;
                }
                Ok(SessionCommand::Ping(t)) => {
                    let _ = self.frame_tx.send(ServerMsg::Pong { t });
                }
                Ok(SessionCommand::Stop) => return false,
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// One step-then-render pass
    pub(crate) fn run_frame(&mut self) -> ServerMsg {
        self.tick += 1;

        // Exactly one snapshot per frame
        let input = *self.input_rx.borrow_and_update();

        self.player.position = self.stepper.step(
            self.player.position,
            input.direction,
            self.player.speed,
            self.world.obstacles(),
        );

        let camera = project(self.player.position, self.viewport);
        let view = self.view_builder.build(
            &self.player,
            camera,
            self.viewport,
            self.world.obstacles(),
            &input,
        );
        self.frames.store(self.view_builder.frames(), Ordering::Relaxed);

        ServerMsg::Frame {
            tick: self.tick,
            position: self.player.position,
            camera,
            view,
        }
    }
}
