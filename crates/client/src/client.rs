use voxelcraft_engine::entity::MoveInput;
use voxelcraft_engine::protocol::{ClientMessage, ServerMessage};
use voxelcraft_engine::EngineContext;

use crate::connection::JoinInfo;
use crate::player::ClientPlayer;
use crate::prediction::Correction;
use crate::world::{ClientPalette, ClientWorld};

/// Whether the session is still going after a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Running,
    Disconnected { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub chunks_received: u64,
    pub chunks_rejected: u64,
    pub chunks_unloaded: u64,
    pub block_updates: u64,
    pub snaps: u64,
    pub blends: u64,
}

/// Client state for one joined session. Owns no I/O: feed it every server
/// message and call [`update`](Self::update) once per frame.
pub struct Client {
    info: JoinInfo,
    world: ClientWorld,
    player: ClientPlayer,
    stats: ClientStats,
}

impl Client {
    pub fn new(info: JoinInfo, name: &str, ctx: &EngineContext) -> Self {
        let palette = ClientPalette::new(info.palette.clone(), ctx);
        let world = ClientWorld::new(info.chunk_dims, palette);
        let player = ClientPlayer::new(info.player_id, name, info.spawn, info.ticks_per_second);
        Self {
            info,
            world,
            player,
            stats: ClientStats::default(),
        }
    }

    pub fn info(&self) -> &JoinInfo {
        &self.info
    }

    pub fn world(&self) -> &ClientWorld {
        &self.world
    }

    pub fn player(&self) -> &ClientPlayer {
        &self.player
    }

    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    pub fn handle_message(&mut self, message: ServerMessage) -> Status {
        match message {
            ServerMessage::ChunkData { pos, payload } => {
                if self.world.load_chunk(pos, payload) {
                    self.stats.chunks_received += 1;
                } else {
                    self.stats.chunks_rejected += 1;
                }
            }
            ServerMessage::UnloadChunk { pos } => {
                if self.world.unload_chunk(pos) {
                    self.stats.chunks_unloaded += 1;
                }
            }
            ServerMessage::BlockUpdate { pos, state } => {
                if self.world.set_block(pos, state) {
                    self.stats.block_updates += 1;
                }
            }
            ServerMessage::PlayerState(state) => match self.player.reconcile(&state) {
                Correction::Snap(p) => {
                    self.stats.snaps += 1;
                    tracing::debug!("Prediction off by more than a snap, moved to {:?}", p);
                }
                Correction::Blend(_) => self.stats.blends += 1,
                Correction::None => {}
            },
            ServerMessage::Disconnect { reason } => {
                tracing::info!("Disconnected by server: {}", reason);
                return Status::Disconnected { reason };
            }
            ServerMessage::Response { id, .. } => {
                tracing::debug!("Unrouted response {}", id);
            }
            ServerMessage::JoinAccepted { .. } | ServerMessage::JoinRejected { .. } => {
                tracing::debug!("Ignoring a join reply after joining");
            }
        }
        Status::Running
    }

    /// Step local prediction by `delta` seconds with `input` held. Returns
    /// the message to send if the input changed.
    pub fn update(&mut self, delta: f64, input: MoveInput) -> Option<ClientMessage> {
        let message = self.player.apply_input(input);
        self.player.predict(&self.world, delta);
        message
    }
}
