//! Paletted chunk storage: round-trips through bit-width growth, snapshots.

use voxelcraft_engine::storage::PalettedStorage;
use voxelcraft_engine::world::chunk::Chunk;
use voxelcraft_engine::world::position::{ChunkDims, ChunkPos, LocalPos};
use voxelcraft_engine::StateId;

#[test]
fn every_coordinate_round_trips_through_growth() {
    let dims = ChunkDims::new(16, 32);
    let mut storage = PalettedStorage::new(dims);
    let mut expected = vec![StateId::AIR; dims.volume()];

    // 300 distinct ids push the width from 0 up to 9 bits.
    let mut widths = Vec::new();
    for i in 0..dims.volume() {
        let id = StateId((i as u32 * 7919) % 300);
        let p = dims.coords(i);
        assert!(storage.set(p.x, p.y, p.z, id));
        expected[i] = id;
        if widths.last() != Some(&storage.bits()) {
            widths.push(storage.bits());
        }
    }
    assert_eq!(widths, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

    for i in 0..dims.volume() {
        let p = dims.coords(i);
        assert_eq!(storage.get(p.x, p.y, p.z), expected[i], "at {p:?}");
    }
}

#[test]
fn overwrite_then_compact_keeps_contents() {
    let dims = ChunkDims::new(8, 8);
    let mut storage = PalettedStorage::new(dims);
    for i in 0..dims.volume() {
        let p = dims.coords(i);
        storage.set(p.x, p.y, p.z, StateId(1 + (i as u32 % 40)));
    }
    let wide = storage.bits();
    for i in 0..dims.volume() {
        let p = dims.coords(i);
        storage.set(p.x, p.y, p.z, if p.y < 4 { StateId(2) } else { StateId::AIR });
    }
    let before = storage.to_dense();
    storage.compact();
    assert_eq!(storage.to_dense(), before);
    assert_eq!(storage.palette_len(), 2);
    assert!(storage.bits() < wide);
}

#[test]
fn snapshot_does_not_see_later_writes() {
    let dims = ChunkDims::new(16, 16);
    let chunk = Chunk::new(ChunkPos::new(0, 0), dims);
    for x in 0..16 {
        chunk.set_block(LocalPos::new(x, 0, 0), StateId(x + 1));
    }
    let snapshot = chunk.create_snapshot();
    let frozen = snapshot.to_dense();

    for x in 0..16 {
        chunk.set_block(LocalPos::new(x, 0, 0), StateId(100 + x));
        chunk.set_block(LocalPos::new(x, 5, 5), StateId(200));
    }
    chunk.compact();

    assert_eq!(snapshot.to_dense(), frozen);
    assert_eq!(snapshot.get_xyz(3, 0, 0), StateId(4));
    assert_eq!(snapshot.get_xyz(3, 5, 5), StateId::AIR);
    assert_eq!(chunk.get_block(LocalPos::new(3, 0, 0)), StateId(103));
}

#[test]
fn snapshot_readable_from_other_threads() {
    let dims = ChunkDims::new(16, 16);
    let chunk = Chunk::new(ChunkPos::new(0, 0), dims);
    chunk.set_block(LocalPos::new(1, 2, 3), StateId(9));
    let snapshot = chunk.create_snapshot();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let snap = snapshot.clone();
            std::thread::spawn(move || snap.get_xyz(1, 2, 3))
        })
        .collect();
    chunk.set_block(LocalPos::new(1, 2, 3), StateId::AIR);
    for h in handles {
        assert_eq!(h.join().unwrap(), StateId(9));
    }
}
