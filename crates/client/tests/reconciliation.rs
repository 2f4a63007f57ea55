use glam::DVec3;
use uuid::Uuid;
use voxelcraft_client::prediction::{reconcile, Correction, BLEND_FACTOR, SNAP_DISTANCE};
use voxelcraft_client::{Client, JoinInfo, Status};
use voxelcraft_engine::content::CoreBlocks;
use voxelcraft_engine::entity::MoveInput;
use voxelcraft_engine::protocol::{ChunkPayload, ClientMessage, PlayerState, ServerMessage};
use voxelcraft_engine::storage::PalettedStorage;
use voxelcraft_engine::world::position::{BlockPos, ChunkDims, ChunkPos};
use voxelcraft_engine::world::BlockSource;
use voxelcraft_engine::{EngineContext, StateId};

const DIMS: ChunkDims = ChunkDims::new(16, 128);

fn state_at(position: DVec3) -> PlayerState {
    PlayerState {
        tick: 1,
        position,
        prev_position: position,
        velocity: DVec3::ZERO,
        on_ground: true,
        yaw: 0.0,
        pitch: 0.0,
        prev_yaw: 0.0,
        prev_pitch: 0.0,
        selected_slot: 0,
        health: 20.0,
        hunger: 20.0,
    }
}

fn client() -> (Client, CoreBlocks) {
    let ctx = EngineContext::bootstrap().unwrap();
    let blocks = CoreBlocks::resolve(&ctx).unwrap();
    let info = JoinInfo {
        player_id: Uuid::new_v4(),
        spawn: DVec3::new(8.5, 65.0, 8.5),
        palette: ctx.palette().descriptors(),
        chunk_dims: DIMS,
        ticks_per_second: 20,
        render_distance: 1,
    };
    (Client::new(info, "tester", &ctx), blocks)
}

/// A chunk with a planks floor whose top face is at y = 65.
fn floor_chunk(blocks: &CoreBlocks) -> ChunkPayload {
    let mut storage = PalettedStorage::new(DIMS);
    for x in 0..16 {
        for z in 0..16 {
            storage.set(x, 64, z, blocks.planks);
        }
    }
    ChunkPayload::from_storage(&storage)
}

#[test]
fn two_block_error_snaps_to_the_server_exactly() {
    let predicted = DVec3::new(8.5, 65.0, 8.5);
    let server = DVec3::new(8.5, 65.0, 10.5);
    let correction = reconcile(predicted, server);
    assert_eq!(correction, Correction::Snap(server));
    assert_eq!(correction.apply(predicted), server);

    let (mut client, _) = client();
    client.handle_message(ServerMessage::PlayerState(state_at(server)));
    assert_eq!(client.player().position(), server);
    assert_eq!(client.stats().snaps, 1);
}

#[test]
fn repeated_small_errors_converge() {
    let (mut client, _) = client();
    let server = DVec3::new(8.5 + SNAP_DISTANCE * 0.8, 65.0, 8.5);
    let mut gap = client.player().position().distance(server);
    for _ in 0..10 {
        client.handle_message(ServerMessage::PlayerState(state_at(server)));
        let next = client.player().position().distance(server);
        assert!((next - gap * (1.0 - BLEND_FACTOR)).abs() < 1e-9);
        gap = next;
    }
    assert!(gap < 0.02);
    assert_eq!(client.stats().snaps, 0);
    assert_eq!(client.stats().blends, 10);
}

#[test]
fn prediction_agrees_with_a_server_that_saw_the_same_input() {
    let (mut client, blocks) = client();
    client.handle_message(ServerMessage::ChunkData {
        pos: ChunkPos::new(0, 0),
        payload: floor_chunk(&blocks),
    });

    let walk = MoveInput {
        forward: 1.0,
        ..MoveInput::default()
    };
    let sent = client.update(0.05, walk);
    assert_eq!(sent, Some(ClientMessage::Input { seq: 1, input: walk }));
    for _ in 0..4 {
        assert_eq!(client.update(0.05, walk), None);
    }
    let predicted = client.player().position();
    assert!(predicted.z > 8.5);
    assert!((predicted.y - 65.0).abs() < 1e-9);

    // Server arrives at the same spot: no correction.
    client.handle_message(ServerMessage::PlayerState(state_at(predicted)));
    assert_eq!(client.player().position(), predicted);
    assert_eq!(client.stats().blends + client.stats().snaps, 0);
}

#[test]
fn world_messages_update_the_mirror() {
    let (mut client, blocks) = client();
    let pos = BlockPos::new(3, 64, 3);
    client.handle_message(ServerMessage::ChunkData {
        pos: ChunkPos::new(0, 0),
        payload: floor_chunk(&blocks),
    });
    assert!(client.world().is_solid(pos));

    client.handle_message(ServerMessage::BlockUpdate { pos, state: StateId::AIR });
    assert!(!client.world().is_solid(pos));
    client.handle_message(ServerMessage::UnloadChunk { pos: ChunkPos::new(0, 0) });
    assert_eq!(client.world().chunk_count(), 0);

    let stats = client.stats();
    assert_eq!((stats.chunks_received, stats.block_updates, stats.chunks_unloaded), (1, 1, 1));
    assert_eq!(
        client.handle_message(ServerMessage::Disconnect { reason: "bye".into() }),
        Status::Disconnected { reason: "bye".into() }
    );
}
