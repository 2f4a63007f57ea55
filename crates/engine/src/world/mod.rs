pub mod block;
pub mod chunk;
pub mod interaction;
pub mod position;
pub mod store;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::{DashMap, DashSet};
use glam::DVec3;
use rayon::prelude::*;
use uuid::Uuid;

use crate::context::{ContextError, EngineContext};
use crate::entity::raycast::{self, RayHit};
use crate::entity::{physics, Entity, EntityKind, EntitySnapshot, EntityStore, Vitals};
use crate::generation::{GenContext, GenerationPool, TerrainGenerator};
use crate::palette::GlobalPalette;
use crate::registry::WorldTemplate;
use block::StateId;
use chunk::{Chunk, ChunkState};
pub use interaction::BlockChange;
use position::{BlockPos, ChunkDims, ChunkPos};
use store::{ChunkStore, StoreError};

/// Queue depth of the generation pool.
const GENERATION_QUEUE: usize = 1024;

/// Read access to blocks by absolute position.
///
/// Anything not backed by a `Ready` chunk reads as air and is not solid.
pub trait BlockSource {
    fn block(&self, pos: BlockPos) -> StateId;
    fn is_solid(&self, pos: BlockPos) -> bool;
}

/// Borrowed view over a world's loaded chunks.
#[derive(Clone, Copy)]
pub struct ChunkView<'a> {
    chunks: &'a DashMap<ChunkPos, Arc<Chunk>>,
    dims: ChunkDims,
    palette: &'a GlobalPalette,
}

impl BlockSource for ChunkView<'_> {
    fn block(&self, pos: BlockPos) -> StateId {
        let Some(local) = pos.local(self.dims) else {
            return StateId::AIR;
        };
        match self.chunks.get(&pos.chunk(self.dims)) {
            Some(chunk) if chunk.is_ready() => chunk.get_block(local),
            _ => StateId::AIR,
        }
    }

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.palette.is_solid(self.block(pos))
    }
}

/// One world: its chunks, entities and clock.
///
/// Chunk operations take `&self`; the chunk map is lock-sharded and each
/// chunk guards its own storage. Entity updates need `&mut self` and belong
/// to the tick thread.
pub struct World {
    ctx: Arc<EngineContext>,
    template: Arc<WorldTemplate>,
    seed: u64,
    dims: ChunkDims,
    chunks: DashMap<ChunkPos, Arc<Chunk>>,
    /// Chunks modified since the last flush.
    dirty: DashSet<ChunkPos>,
    pool: GenerationPool,
    store: Arc<dyn ChunkStore>,
    loaded_tx: Sender<ChunkPos>,
    loaded_rx: Receiver<ChunkPos>,
    entities: EntityStore,
    game_time: f64,
    tick_count: u64,
    loaded_from_store: AtomicU64,
    unloaded: u64,
}

impl World {
    pub fn new(
        ctx: Arc<EngineContext>,
        template: Arc<WorldTemplate>,
        seed: u64,
        store: Arc<dyn ChunkStore>,
        workers: usize,
    ) -> Result<Self, ContextError> {
        let gen_ctx = GenContext::new(Arc::clone(&ctx), &template, seed)?;
        let generator = TerrainGenerator::for_kind(template.generator);
        Ok(Self::with_generator(ctx, template, seed, store, workers, generator, gen_ctx))
    }

    /// Build with an explicit generator chain and generation context.
    pub fn with_generator(
        ctx: Arc<EngineContext>,
        template: Arc<WorldTemplate>,
        seed: u64,
        store: Arc<dyn ChunkStore>,
        workers: usize,
        generator: TerrainGenerator,
        gen_ctx: GenContext,
    ) -> Self {
        tracing::info!(
            "Creating world from template {} (seed {}, {} generation workers)",
            template.name,
            seed,
            workers.max(1)
        );
        let pool = GenerationPool::new(workers, GENERATION_QUEUE, Arc::new(generator), Arc::new(gen_ctx));
        let (loaded_tx, loaded_rx) = unbounded();
        Self {
            dims: template.chunk_dims,
            ctx,
            template,
            seed,
            chunks: DashMap::new(),
            dirty: DashSet::new(),
            pool,
            store,
            loaded_tx,
            loaded_rx,
            entities: EntityStore::new(),
            game_time: 0.0,
            tick_count: 0,
            loaded_from_store: AtomicU64::new(0),
            unloaded: 0,
        }
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    pub fn template(&self) -> &Arc<WorldTemplate> {
        &self.template
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn game_time(&self) -> f64 {
        self.game_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn blocks(&self) -> ChunkView<'_> {
        ChunkView {
            chunks: &self.chunks,
            dims: self.dims,
            palette: self.ctx.palette(),
        }
    }

    // ── Blocks ──────────────────────────────────────────────────────

    /// Block at an absolute position. Air for chunks that are not `Ready`.
    pub fn get_block(&self, pos: BlockPos) -> StateId {
        self.blocks().block(pos)
    }

    pub fn is_solid(&self, pos: BlockPos) -> bool {
        self.blocks().is_solid(pos)
    }

    /// Write a block and mark its chunk dirty. False when the chunk is not
    /// `Ready` or `pos` is outside the column.
    pub fn set_block(&self, pos: BlockPos, id: StateId) -> bool {
        let Some(local) = pos.local(self.dims) else {
            return false;
        };
        let chunk_pos = pos.chunk(self.dims);
        let written = match self.chunks.get(&chunk_pos) {
            Some(chunk) if chunk.is_ready() => chunk.set_block(local, id),
            _ => false,
        };
        if written {
            self.dirty.insert(chunk_pos);
        }
        written
    }

    /// First non-solid y above the highest solid block of the column, in a
    /// `Ready` chunk.
    pub fn find_surface_y(&self, x: i32, z: i32) -> Option<i32> {
        let h = self.dims.height as i32;
        let top = (0..h).rev().find(|&y| self.is_solid(BlockPos::new(x, y, z)))?;
        (top + 1 < h).then_some(top + 1)
    }

    pub fn raycast(&self, origin: DVec3, dir: DVec3, max_distance: f64) -> Option<RayHit> {
        raycast::cast(origin, dir, max_distance, &self.blocks())
    }

    // ── Chunk lifecycle ─────────────────────────────────────────────

    pub fn chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.get(&pos).map(|c| Arc::clone(&c))
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn loaded_chunks(&self) -> Vec<ChunkPos> {
        self.chunks.iter().map(|e| *e.key()).collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Load `pos` from the store, or queue it for generation if it was never
    /// saved. Returns immediately; the chunk shows up in
    /// [`drain_ready`](Self::drain_ready) once it is `Ready`.
    pub fn request_chunk(&self, pos: ChunkPos) -> Arc<Chunk> {
        if let Some(chunk) = self.chunk(pos) {
            return chunk;
        }
        let chunk = self
            .chunks
            .entry(pos)
            .or_insert_with(|| Arc::new(Chunk::new(pos, self.dims)))
            .value()
            .clone();
        if !chunk.transition(ChunkState::New, ChunkState::Generating) {
            return chunk;
        }

        match self.store.load_chunk(pos, self.dims) {
            Ok(Some(storage)) => {
                chunk.load(storage);
                self.loaded_from_store.fetch_add(1, Ordering::Relaxed);
                let _ = self.loaded_tx.send(pos);
                tracing::trace!("Loaded chunk {:?} from store", pos);
            }
            Ok(None) => {
                self.pool.submit(Arc::clone(&chunk));
            }
            Err(e) => {
                tracing::error!("Failed to load chunk {:?}, regenerating: {}", pos, e);
                self.pool.submit(Arc::clone(&chunk));
            }
        }
        chunk
    }

    /// Like [`request_chunk`](Self::request_chunk), but waits until the chunk
    /// is `Ready`.
    pub fn ensure_chunk(&self, pos: ChunkPos) -> Arc<Chunk> {
        let chunk = self.request_chunk(pos);
        if !chunk.is_ready() {
            self.pool.generate_blocking(Arc::clone(&chunk));
        }
        chunk
    }

    /// Synchronously prepare every chunk within `radius` of `center`.
    pub fn prepare_area(&self, center: ChunkPos, radius: i32) {
        let start = Instant::now();
        let positions: Vec<ChunkPos> = (-radius..=radius)
            .flat_map(|dx| (-radius..=radius).map(move |dz| ChunkPos::new(center.x + dx, center.z + dz)))
            .collect();
        let chunks: Vec<Arc<Chunk>> = positions.iter().map(|&p| self.request_chunk(p)).collect();
        for chunk in chunks {
            if !chunk.is_ready() {
                self.pool.generate_blocking(chunk);
            }
        }
        tracing::info!(
            "Prepared {} chunks around {:?} in {:?}",
            positions.len(),
            center,
            start.elapsed()
        );
    }

    /// Chunks that became `Ready` since the last call and are still loaded.
    pub fn drain_ready(&self) -> Vec<ChunkPos> {
        let mut ready = self.pool.drain_ready();
        ready.extend(self.loaded_rx.try_iter());
        ready.retain(|pos| self.chunks.get(pos).is_some_and(|c| c.is_ready()));
        ready
    }

    /// Flush `pos` and drop it. Tracked non-player entities are saved and
    /// removed with it. The chunk ends `Invalid`.
    pub fn unload_chunk(&mut self, pos: ChunkPos) -> Result<bool, StoreError> {
        let Some((_, chunk)) = self.chunks.remove(&pos) else {
            return Ok(false);
        };
        let was_dirty = self.dirty.remove(&pos).is_some();
        let mut result = self.flush_chunk(&chunk, was_dirty).map(|_| ());

        for id in chunk.tracked_entities() {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            if entity.kind == EntityKind::Player {
                continue;
            }
            if let Err(e) = self.store.save_entity(&entity.snapshot()) {
                result = result.and(Err(e));
            }
            self.entities.remove(&id);
        }

        chunk.set_state(ChunkState::Invalid);
        self.unloaded += 1;
        tracing::trace!("Unloaded chunk {:?}", pos);
        result.map(|_| true)
    }

    fn flush_chunk(&self, chunk: &Chunk, force: bool) -> Result<bool, StoreError> {
        if chunk.state() != ChunkState::Ready {
            return Ok(false);
        }
        let dirty = chunk.take_dirty();
        if !(dirty || force) {
            return Ok(false);
        }
        chunk.compact();
        self.store.save_chunk(chunk.pos(), &chunk.storage())?;
        Ok(true)
    }

    /// Drain and return all chunk positions modified since the last call.
    pub fn take_dirty_chunks(&self) -> Vec<ChunkPos> {
        let dirty: Vec<ChunkPos> = self.dirty.iter().map(|p| *p).collect();
        for pos in &dirty {
            self.dirty.remove(pos);
        }
        dirty
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Write every dirty chunk and dirty entity to the store. Returns the
    /// number of chunks written.
    pub fn flush_dirty(&mut self) -> Result<usize, StoreError> {
        let positions = self.take_dirty_chunks();
        let written = positions
            .par_iter()
            .filter_map(|pos| self.chunk(*pos))
            .map(|chunk| self.flush_chunk(&chunk, true))
            .collect::<Result<Vec<bool>, StoreError>>()?
            .into_iter()
            .filter(|w| *w)
            .count();

        for entity in self.entities.iter_mut().filter(|e| e.dirty) {
            self.store.save_entity(&entity.snapshot())?;
            entity.dirty = false;
        }
        self.store.flush()?;
        Ok(written)
    }

    pub fn loaded_from_store(&self) -> u64 {
        self.loaded_from_store.load(Ordering::Relaxed)
    }

    pub fn generated_count(&self) -> u64 {
        self.pool.generated_count()
    }

    pub fn unloaded_count(&self) -> u64 {
        self.unloaded
    }

    // ── Entities ────────────────────────────────────────────────────

    /// Add an entity and start tracking it in its chunk if that is loaded.
    pub fn spawn_entity(&mut self, mut entity: Entity) -> Uuid {
        let id = entity.id;
        let pos = entity.chunk_pos(self.dims);
        if let Some(chunk) = self.chunk(pos) {
            chunk.track_entity(id);
            entity.chunk = Some(pos);
        }
        self.entities.insert(entity);
        id
    }

    /// Remove an entity and retract it from its chunk's tracking.
    pub fn remove_entity(&mut self, id: &Uuid) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        if let Some(chunk) = entity.chunk.and_then(|pos| self.chunk(pos)) {
            chunk.untrack_entity(*id);
        }
        Some(entity)
    }

    pub fn entity(&self, id: &Uuid) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: &Uuid) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn load_entity(&self, id: Uuid) -> Result<Option<EntitySnapshot>, StoreError> {
        self.store.load_entity(id)
    }

    pub fn save_entity(&self, id: &Uuid) -> Result<bool, StoreError> {
        match self.entities.get(id) {
            Some(entity) => self.store.save_entity(&entity.snapshot()).map(|_| true),
            None => Ok(false),
        }
    }

    /// Feet position for a new player: the surface at the center of chunk
    /// (0, 0), which is generated first if needed.
    pub fn spawn_point(&self) -> DVec3 {
        self.ensure_chunk(ChunkPos::new(0, 0));
        let c = self.dims.width as i32 / 2;
        let y = self.find_surface_y(c, c).unwrap_or(self.dims.height as i32);
        DVec3::new(f64::from(c) + 0.5, f64::from(y), f64::from(c) + 0.5)
    }

    // ── Simulation ──────────────────────────────────────────────────

    /// One world step of `delta` seconds: player input, physics and vitals
    /// for every entity (in parallel), then chunk re-homing and deaths.
    /// Returns the ids of entities whose position changed.
    pub fn update(&mut self, delta: f64) -> Vec<Uuid> {
        self.game_time += delta;
        self.tick_count += 1;
        let tps = self.template.ticks_per_second;
        let view = ChunkView {
            chunks: &self.chunks,
            dims: self.dims,
            palette: self.ctx.palette(),
        };

        let mut moved: Vec<Uuid> = self
            .entities
            .map_mut()
            .par_iter_mut()
            .filter_map(|(id, entity)| {
                entity.transform.begin_tick();
                if let Some(input) = entity.control.as_ref().map(|c| c.input) {
                    physics::apply_input(entity, input, tps, delta);
                }
                let moved = physics::step(entity, &view, delta);
                if let Some(vitals) = entity.vitals.as_mut() {
                    if vitals.tick(delta.min(physics::MAX_STEP) as f32) {
                        entity.dirty = true;
                    }
                }
                moved.then_some(*id)
            })
            .collect();

        for id in &moved {
            self.rehome(id);
        }
        self.reap(&mut moved);
        moved
    }

    /// Dead creatures are removed; dead players respawn at the spawn point
    /// with full vitals.
    fn reap(&mut self, moved: &mut Vec<Uuid>) {
        let dead: Vec<(Uuid, EntityKind)> = self
            .entities
            .iter()
            .filter(|e| e.vitals.is_some_and(|v| v.is_dead()))
            .map(|e| (e.id, e.kind))
            .collect();
        if dead.is_empty() {
            return;
        }
        let spawn = dead
            .iter()
            .any(|(_, kind)| *kind == EntityKind::Player)
            .then(|| self.spawn_point());

        for (id, kind) in dead {
            match (kind, spawn) {
                (EntityKind::Player, Some(spawn)) => {
                    let Some(entity) = self.entities.get_mut(&id) else {
                        continue;
                    };
                    entity.transform.position = spawn;
                    entity.transform.prev_position = spawn;
                    if let Some(body) = entity.physics.as_mut() {
                        body.velocity = DVec3::ZERO;
                        body.on_ground = false;
                    }
                    entity.vitals = Some(Vitals::default());
                    entity.dirty = true;
                    self.rehome(&id);
                    if !moved.contains(&id) {
                        moved.push(id);
                    }
                    tracing::info!("Player {} died and respawned at {:?}", id, spawn);
                }
                _ => {
                    self.remove_entity(&id);
                    moved.retain(|m| *m != id);
                    tracing::debug!("Entity {} died", id);
                }
            }
        }
    }

    /// Move an entity's chunk tracking to wherever it stands now.
    fn rehome(&mut self, id: &Uuid) {
        let dims = self.dims;
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let now = entity.chunk_pos(dims);
        let before = entity.chunk;
        if before == Some(now) {
            // The chunk may have been reloaded since the entity was tracked.
            if let Some(chunk) = self.chunks.get(&now) {
                chunk.track_entity(*id);
                chunk.mark_entities_dirty();
            }
            return;
        }
        if let Some(old) = before.and_then(|p| self.chunks.get(&p)) {
            old.untrack_entity(*id);
        }
        entity.chunk = match self.chunks.get(&now) {
            Some(chunk) => {
                chunk.track_entity(*id);
                Some(now)
            }
            None => None,
        };
    }

    /// Flush everything and stop the generation workers.
    pub fn shutdown(&mut self) -> Result<usize, StoreError> {
        let positions = self.loaded_chunks();
        for pos in &positions {
            if let Some(chunk) = self.chunk(*pos) {
                if chunk.is_dirty() {
                    self.dirty.insert(*pos);
                }
            }
        }
        let written = self.flush_dirty()?;
        self.pool.shutdown();
        tracing::info!("World shut down ({} chunks written)", written);
        Ok(written)
    }
}
