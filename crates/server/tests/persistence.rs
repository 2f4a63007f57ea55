use std::sync::Arc;

use glam::DVec3;
use voxelcraft_engine::content::{self, CoreBlocks};
use voxelcraft_engine::entity::{Entity, EntityKind};
use voxelcraft_engine::registry::RegName;
use voxelcraft_engine::storage::PalettedStorage;
use voxelcraft_engine::world::position::{BlockPos, ChunkDims, ChunkPos};
use voxelcraft_engine::world::store::ChunkStore;
use voxelcraft_engine::{EngineContext, World};
use voxelcraft_server::persistence::RegionStore;

const DIMS: ChunkDims = ChunkDims::new(16, 128);

fn sample_chunk(blocks: &CoreBlocks) -> PalettedStorage {
    let mut storage = PalettedStorage::new(DIMS);
    for x in 0..16 {
        for z in 0..16 {
            storage.set(x, 0, z, blocks.bedrock);
            storage.set(x, 1, z, blocks.stone);
        }
    }
    storage.set(3, 2, 5, blocks.water);
    storage
}

#[test]
fn chunks_survive_a_flush_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = EngineContext::bootstrap().unwrap();
    let blocks = CoreBlocks::resolve(&ctx).unwrap();
    let chunk = sample_chunk(&blocks);
    let far = ChunkPos::new(-40, 70);

    let store = RegionStore::open(dir.path(), Arc::clone(&ctx)).unwrap();
    assert_eq!(store.load_chunk(ChunkPos::new(0, 0), DIMS).unwrap(), None);
    store.save_chunk(ChunkPos::new(0, 0), &chunk).unwrap();
    store.save_chunk(far, &chunk).unwrap();
    assert_eq!(store.pending_count(), 2);

    // Buffered chunks read back before they reach disk.
    assert_eq!(store.load_chunk(ChunkPos::new(0, 0), DIMS).unwrap(), Some(chunk.clone()));

    store.flush().unwrap();
    assert_eq!(store.pending_count(), 0);
    assert!(dir.path().join("region/r.0.0.mca").exists());
    assert!(dir.path().join("region/r.-2.2.mca").exists());

    let reopened = RegionStore::open(dir.path(), ctx).unwrap();
    let loaded = reopened.load_chunk(far, DIMS).unwrap().unwrap();
    assert_eq!(loaded.get(3, 2, 5), blocks.water);
    assert_eq!(loaded.get(7, 1, 7), blocks.stone);
    assert_eq!(loaded.to_dense(), chunk.to_dense());
    assert_eq!(reopened.load_chunk(ChunkPos::new(1, 0), DIMS).unwrap(), None);
}

#[test]
fn second_flush_updates_a_region_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = EngineContext::bootstrap().unwrap();
    let blocks = CoreBlocks::resolve(&ctx).unwrap();
    let store = RegionStore::open(dir.path(), Arc::clone(&ctx)).unwrap();

    let mut chunk = sample_chunk(&blocks);
    store.save_chunk(ChunkPos::new(2, 2), &chunk).unwrap();
    store.save_chunk(ChunkPos::new(3, 2), &chunk).unwrap();
    store.flush().unwrap();

    chunk.set(0, 5, 0, blocks.planks);
    store.save_chunk(ChunkPos::new(2, 2), &chunk).unwrap();
    store.flush().unwrap();

    let reopened = RegionStore::open(dir.path(), ctx).unwrap();
    let updated = reopened.load_chunk(ChunkPos::new(2, 2), DIMS).unwrap().unwrap();
    assert_eq!(updated.get(0, 5, 0), blocks.planks);
    let untouched = reopened.load_chunk(ChunkPos::new(3, 2), DIMS).unwrap().unwrap();
    assert_eq!(untouched.get(0, 5, 0), blocks.air);
}

#[test]
fn mismatched_dimensions_are_reported_as_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = EngineContext::bootstrap().unwrap();
    let blocks = CoreBlocks::resolve(&ctx).unwrap();
    let store = RegionStore::open(dir.path(), ctx).unwrap();
    store.save_chunk(ChunkPos::new(0, 0), &sample_chunk(&blocks)).unwrap();

    let err = store.load_chunk(ChunkPos::new(0, 0), ChunkDims::new(16, 256)).unwrap_err();
    assert!(err.to_string().contains("chunk (0, 0)"), "{err}");
}

#[test]
fn player_records_round_trip_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = EngineContext::bootstrap().unwrap();
    let store = RegionStore::open(dir.path(), Arc::clone(&ctx)).unwrap();

    let mut player = Entity::player(uuid::Uuid::new_v4(), "steve", DVec3::new(1.5, 70.0, -3.25));
    player.transform.rotate(45.0, -10.0);
    let planks = ctx
        .registry()
        .item(&RegName::parse(content::PLANKS).unwrap())
        .unwrap();
    player.inventory.as_mut().unwrap().insert(&planks, 12);
    let snapshot = player.snapshot();

    assert_eq!(store.load_entity(snapshot.id).unwrap(), None);
    store.save_entity(&snapshot).unwrap();
    let loaded = store.load_entity(snapshot.id).unwrap().unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.kind, EntityKind::Player);

    let restored = Entity::from_snapshot(&loaded, ctx.registry());
    assert_eq!(restored.position(), DVec3::new(1.5, 70.0, -3.25));
    assert_eq!(restored.inventory.as_ref().unwrap().slot(0).unwrap().count(), 12);
}

#[test]
fn edited_world_reloads_from_region_files() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = EngineContext::bootstrap().unwrap();
    let template = ctx
        .registry()
        .template(&RegName::parse(content::SPAWN_PLATFORM).unwrap())
        .unwrap();
    let blocks = CoreBlocks::resolve(&ctx).unwrap();
    let edit = BlockPos::new(5, 70, 5);

    {
        let store = Arc::new(RegionStore::open(dir.path(), Arc::clone(&ctx)).unwrap());
        let mut world = World::new(Arc::clone(&ctx), Arc::clone(&template), 42, store, 2).unwrap();
        world.ensure_chunk(ChunkPos::new(0, 0));
        assert!(world.set_block(edit, blocks.stone));
        world.shutdown().unwrap();
    }

    let store = Arc::new(RegionStore::open(dir.path(), Arc::clone(&ctx)).unwrap());
    let mut world = World::new(ctx, template, 42, store, 2).unwrap();
    world.ensure_chunk(ChunkPos::new(0, 0));
    assert_eq!(world.get_block(edit), blocks.stone);
    assert_eq!(world.get_block(BlockPos::new(8, 64, 8)), blocks.planks);
    assert_eq!(world.loaded_from_store(), 1);
    assert_eq!(world.generated_count(), 0);
    world.shutdown().unwrap();
}
