//! World persistence on disk.
//!
//! Chunks live in region files `<dir>/region/r.X.Z.mca` (32x32 chunks each,
//! via `fastanvil`), one NBT compound per chunk. Block states are stored by
//! descriptor (`voxelcraft:water[level=0]`) so saves survive palette id
//! changes between versions. Player records are JSON files under
//! `<dir>/entities/`, and `<dir>/level.ron` keeps the seed and template.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voxelcraft_engine::entity::EntitySnapshot;
use voxelcraft_engine::storage::bit_packed::BitPackedArray;
use voxelcraft_engine::storage::PalettedStorage;
use voxelcraft_engine::world::position::{ChunkDims, ChunkPos};
use voxelcraft_engine::world::store::{ChunkStore, StoreError};
use voxelcraft_engine::{EngineContext, StateId};

use crate::config::WorldConfig;

/// Version tag written into every chunk compound.
const FORMAT_VERSION: i32 = 1;

/// Chunks per region side.
const REGION_SIZE: i32 = 32;

// ── Chunk NBT ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug)]
struct ChunkNbt {
    #[serde(rename = "DataVersion")]
    data_version: i32,
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(rename = "Width")]
    width: i32,
    #[serde(rename = "Height")]
    height: i32,
    block_states: BlockStatesNbt,
}

#[derive(Serialize, Deserialize, Debug)]
struct BlockStatesNbt {
    /// Local palette as state descriptors; entry 0 is always air.
    palette: Vec<String>,
    bits: i32,
    /// Packed palette indices, YZX order, entries never span two longs.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<i64>>,
}

fn region_of(pos: ChunkPos) -> (i32, i32) {
    (pos.x.div_euclid(REGION_SIZE), pos.z.div_euclid(REGION_SIZE))
}

fn region_local(pos: ChunkPos) -> (usize, usize) {
    (
        pos.x.rem_euclid(REGION_SIZE) as usize,
        pos.z.rem_euclid(REGION_SIZE) as usize,
    )
}

fn to_store_error(what: String, err: anyhow::Error) -> StoreError {
    match err.downcast::<std::io::Error>() {
        Ok(io) => StoreError::Io(io),
        Err(err) => StoreError::Corrupt {
            what,
            reason: format!("{err:#}"),
        },
    }
}

// ── Region store ────────────────────────────────────────────────────────────

/// [`ChunkStore`] backed by region files and per-entity JSON records.
///
/// `save_chunk` only encodes and buffers; [`flush`](ChunkStore::flush) groups
/// the buffered chunks by region and rewrites each touched region file once.
pub struct RegionStore {
    region_dir: PathBuf,
    entity_dir: PathBuf,
    ctx: Arc<EngineContext>,
    /// Global palette descriptors, indexed by state id.
    descriptors: Vec<String>,
    /// Reverse of `descriptors`.
    ids: HashMap<String, StateId>,
    /// Encoded chunks waiting for the next flush, by region.
    pending: Mutex<HashMap<(i32, i32), HashMap<ChunkPos, Vec<u8>>>>,
}

impl RegionStore {
    pub fn open(dir: &Path, ctx: Arc<EngineContext>) -> Result<Self> {
        let region_dir = dir.join("region");
        let entity_dir = dir.join("entities");
        fs::create_dir_all(&region_dir)
            .with_context(|| format!("creating {}", region_dir.display()))?;
        fs::create_dir_all(&entity_dir)
            .with_context(|| format!("creating {}", entity_dir.display()))?;

        let descriptors = ctx.palette().descriptors();
        let ids = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.clone(), StateId(i as u32)))
            .collect();
        tracing::info!("Opened world storage at {}", dir.display());
        Ok(Self {
            region_dir,
            entity_dir,
            ctx,
            descriptors,
            ids,
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    /// Number of chunks encoded but not yet written to a region file.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().values().map(HashMap::len).sum()
    }

    fn region_path(&self, (rx, rz): (i32, i32)) -> PathBuf {
        self.region_dir.join(format!("r.{}.{}.mca", rx, rz))
    }

    fn entity_path(&self, id: Uuid) -> PathBuf {
        self.entity_dir.join(format!("{id}.json"))
    }

    fn descriptor(&self, id: StateId) -> &str {
        self.descriptors
            .get(id.0 as usize)
            .map_or(voxelcraft_engine::content::AIR, String::as_str)
    }

    fn state_id(&self, descriptor: &str) -> StateId {
        match self.ids.get(descriptor) {
            Some(&id) => id,
            None => {
                tracing::warn!("Unknown block state in save file: {}, defaulting to air", descriptor);
                StateId::AIR
            }
        }
    }

    fn chunk_to_nbt(&self, pos: ChunkPos, storage: &PalettedStorage) -> ChunkNbt {
        let dims = storage.dims();
        let palette = storage
            .palette()
            .iter()
            .map(|id| self.descriptor(*id).to_string())
            .collect();
        let words = storage.packed().raw_data();
        ChunkNbt {
            data_version: FORMAT_VERSION,
            x_pos: pos.x,
            z_pos: pos.z,
            width: dims.width as i32,
            height: dims.height as i32,
            block_states: BlockStatesNbt {
                palette,
                bits: i32::from(storage.bits()),
                data: (!words.is_empty()).then(|| words.iter().map(|w| *w as i64).collect()),
            },
        }
    }

    fn nbt_to_storage(&self, nbt: ChunkNbt, dims: ChunkDims) -> Result<PalettedStorage> {
        let saved = ChunkDims::new(nbt.width as u32, nbt.height as u32);
        anyhow::ensure!(
            saved == dims,
            "saved with {:?}, world uses {:?}",
            saved,
            dims
        );
        let states = nbt.block_states;
        let palette: Vec<StateId> = states.palette.iter().map(|d| self.state_id(d)).collect();
        let bits = u8::try_from(states.bits).context("bit width out of range")?;
        let words = states
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|w| w as u64)
            .collect();
        let data = BitPackedArray::from_raw(bits, dims.volume(), words)
            .context("packed data does not match its bit width")?;
        PalettedStorage::from_parts(dims, palette, data).context("inconsistent local palette")
    }

    fn decode(&self, bytes: &[u8], pos: ChunkPos, dims: ChunkDims) -> Result<PalettedStorage> {
        let nbt: ChunkNbt = fastnbt::from_bytes(bytes)
            .with_context(|| format!("deserializing chunk ({}, {})", pos.x, pos.z))?;
        anyhow::ensure!(
            (nbt.x_pos, nbt.z_pos) == (pos.x, pos.z),
            "chunk ({}, {}) is stored in the slot of ({}, {})",
            nbt.x_pos,
            nbt.z_pos,
            pos.x,
            pos.z
        );
        self.nbt_to_storage(nbt, dims)
    }

    fn read_from_region(&self, pos: ChunkPos) -> Result<Option<Vec<u8>>> {
        let region = region_of(pos);
        let path = self.region_path(region);
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&path)
            .with_context(|| format!("opening region file {}", path.display()))?;
        let mut region = fastanvil::Region::from_stream(file)
            .with_context(|| format!("parsing region file {}", path.display()))?;
        let (x, z) = region_local(pos);
        region
            .read_chunk(x, z)
            .with_context(|| format!("reading chunk ({}, {}) from {}", pos.x, pos.z, path.display()))
    }

    fn write_region(&self, key: (i32, i32), chunks: &HashMap<ChunkPos, Vec<u8>>) -> Result<usize> {
        let path = self.region_path(key);
        let (rx, rz) = key;

        let mut region = if path.exists() {
            let file_bytes =
                fs::read(&path).with_context(|| format!("reading region r.{}.{}", rx, rz))?;
            fastanvil::Region::from_stream(Cursor::new(file_bytes))
                .with_context(|| format!("parsing region r.{}.{}", rx, rz))?
        } else {
            fastanvil::Region::new(Cursor::new(Vec::new()))
                .with_context(|| format!("creating region r.{}.{}", rx, rz))?
        };

        for (pos, bytes) in chunks {
            let (x, z) = region_local(*pos);
            region
                .write_chunk(x, z, bytes)
                .with_context(|| format!("writing chunk ({}, {})", pos.x, pos.z))?;
        }

        let mut cursor = region.into_inner()?;
        let len = cursor.stream_position()?;
        let data = cursor.into_inner();
        fs::write(&path, &data[..len as usize])
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(chunks.len())
    }

    /// Write every buffered chunk. Regions that fail keep their chunks
    /// buffered for the next attempt.
    fn flush_regions(&self) -> Result<usize> {
        let batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return Ok(0);
        }
        let start = Instant::now();
        let regions = batch.len();
        let mut written = 0;
        let mut first_error = None;

        for (key, chunks) in batch {
            match self.write_region(key, &chunks) {
                Ok(n) => written += n,
                Err(e) => {
                    let mut pending = self.pending.lock();
                    let slot = pending.entry(key).or_default();
                    for (pos, bytes) in chunks {
                        // Newer encodings saved meanwhile win.
                        slot.entry(pos).or_insert(bytes);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!(
            "World saved: {} chunks across {} regions ({:.2?})",
            written,
            regions,
            start.elapsed()
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

impl ChunkStore for RegionStore {
    fn load_chunk(&self, pos: ChunkPos, dims: ChunkDims) -> Result<Option<PalettedStorage>, StoreError> {
        let what = || format!("chunk ({}, {})", pos.x, pos.z);
        let buffered = self
            .pending
            .lock()
            .get(&region_of(pos))
            .and_then(|r| r.get(&pos).cloned());
        let bytes = match buffered {
            Some(bytes) => bytes,
            None => match self.read_from_region(pos).map_err(|e| to_store_error(what(), e))? {
                Some(bytes) => bytes,
                None => return Ok(None),
            },
        };
        self.decode(&bytes, pos, dims)
            .map(Some)
            .map_err(|e| to_store_error(what(), e))
    }

    fn save_chunk(&self, pos: ChunkPos, storage: &PalettedStorage) -> Result<(), StoreError> {
        let nbt = self.chunk_to_nbt(pos, storage);
        let bytes = fastnbt::to_bytes(&nbt).map_err(|e| StoreError::Encode {
            what: format!("chunk ({}, {})", pos.x, pos.z),
            reason: e.to_string(),
        })?;
        self.pending
            .lock()
            .entry(region_of(pos))
            .or_default()
            .insert(pos, bytes);
        Ok(())
    }

    fn load_entity(&self, id: Uuid) -> Result<Option<EntitySnapshot>, StoreError> {
        let path = self.entity_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                what: format!("entity {id}"),
                reason: e.to_string(),
            })
    }

    fn save_entity(&self, snapshot: &EntitySnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Encode {
            what: format!("entity {}", snapshot.id),
            reason: e.to_string(),
        })?;
        let path = self.entity_path(snapshot.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.flush_regions()
            .map(|_| ())
            .map_err(|e| to_store_error("region files".to_string(), e))
    }
}

// ── Level info ──────────────────────────────────────────────────────────────

/// World identity that must not change once chunks exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub seed: u64,
    pub template: String,
}

impl LevelInfo {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join("level.ron")
    }

    /// Read `<dir>/level.ron`, or create it from `config`. A zero seed is
    /// replaced by a random one.
    pub fn load_or_create(dir: &Path, config: &WorldConfig) -> Result<Self> {
        let path = Self::path(dir);
        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let info: LevelInfo = ron::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?;
            if info.template != config.template {
                tracing::warn!(
                    "World was created with template {}, ignoring configured {}",
                    info.template,
                    config.template
                );
            }
            tracing::info!("Loaded level (seed {}, template {})", info.seed, info.template);
            return Ok(info);
        }

        let seed = match config.seed {
            0 => rand::random::<u64>(),
            s => s,
        };
        let info = LevelInfo {
            seed,
            template: config.template.clone(),
        };
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let text = ron::ser::to_string_pretty(&info, ron::ser::PrettyConfig::new())
            .context("serializing level info")?;
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Created new level (seed {}, template {})", info.seed, info.template);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_coordinates_floor_towards_negative() {
        assert_eq!(region_of(ChunkPos::new(0, 31)), (0, 0));
        assert_eq!(region_of(ChunkPos::new(-1, 32)), (-1, 1));
        assert_eq!(region_local(ChunkPos::new(-1, 33)), (31, 1));
    }

    #[test]
    fn level_info_keeps_its_random_seed() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::default();
        let first = LevelInfo::load_or_create(dir.path(), &config).unwrap();
        let again = LevelInfo::load_or_create(dir.path(), &config).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.template, voxelcraft_engine::content::OVERWORLD);

        let other = tempfile::tempdir().unwrap();
        let fixed = WorldConfig {
            seed: 77,
            ..WorldConfig::default()
        };
        assert_eq!(LevelInfo::load_or_create(other.path(), &fixed).unwrap().seed, 77);
    }
}
