use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Entity, MoveInput};
use crate::storage::{BitPackedArray, PalettedStorage};
use crate::world::block::StateId;
use crate::world::position::{BlockPos, ChunkDims, ChunkPos};

/// Bumped whenever a message layout changes.
pub const PROTOCOL_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Break the targeted block.
    Attack,
    /// Place the selected item against the targeted face.
    Use,
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Join { protocol_version: u32, name: String },
    Input { seq: u32, input: MoveInput },
    CameraDelta { yaw: f32, pitch: f32 },
    SelectHotbar { slot: u8 },
    Action { kind: ActionKind },
    Request { id: u64, body: RequestBody },
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestBody {
    Ping,
    WorldInfo,
    BlockAt(BlockPos),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    Pong,
    WorldInfo {
        template: String,
        seed: u64,
        tick: u64,
        game_time: f64,
        players: u32,
    },
    BlockAt {
        pos: BlockPos,
        state: StateId,
        descriptor: String,
    },
    Error(String),
}

/// Authoritative transform and status of a player, sent every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub tick: u64,
    pub position: DVec3,
    pub prev_position: DVec3,
    pub velocity: DVec3,
    pub on_ground: bool,
    pub yaw: f32,
    pub pitch: f32,
    pub prev_yaw: f32,
    pub prev_pitch: f32,
    pub selected_slot: u8,
    pub health: f32,
    pub hunger: f32,
}

impl PlayerState {
    pub fn of(entity: &Entity, tick: u64) -> Self {
        let t = &entity.transform;
        let body = entity.physics.unwrap_or_default();
        let vitals = entity.vitals.unwrap_or_default();
        Self {
            tick,
            position: t.position,
            prev_position: t.prev_position,
            velocity: body.velocity,
            on_ground: body.on_ground,
            yaw: t.yaw,
            pitch: t.pitch,
            prev_yaw: t.prev_yaw,
            prev_pitch: t.prev_pitch,
            selected_slot: entity.inventory.as_ref().map_or(0, |i| i.selected_slot() as u8),
            health: vitals.health,
            hunger: vitals.hunger,
        }
    }
}

/// Packed block data of one chunk as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub dims: ChunkDims,
    pub palette: Vec<StateId>,
    pub bits: u8,
    pub words: Vec<u64>,
}

impl ChunkPayload {
    pub fn from_storage(storage: &PalettedStorage) -> Self {
        Self {
            dims: storage.dims(),
            palette: storage.palette().to_vec(),
            bits: storage.bits(),
            words: storage.packed().raw_data().to_vec(),
        }
    }

    /// `None` if the payload is internally inconsistent.
    pub fn into_storage(self) -> Option<PalettedStorage> {
        let data = BitPackedArray::from_raw(self.bits, self.dims.volume(), self.words)?;
        PalettedStorage::from_parts(self.dims, self.palette, data)
    }
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    JoinAccepted {
        player_id: Uuid,
        spawn: DVec3,
        /// Canonical state descriptors indexed by global state id.
        palette: Vec<String>,
        chunk_dims: ChunkDims,
        ticks_per_second: u32,
        render_distance: u32,
    },
    JoinRejected { reason: String },
    ChunkData { pos: ChunkPos, payload: ChunkPayload },
    UnloadChunk { pos: ChunkPos },
    PlayerState(PlayerState),
    BlockUpdate { pos: BlockPos, state: StateId },
    Response { id: u64, body: ResponseBody },
    Disconnect { reason: String },
}
