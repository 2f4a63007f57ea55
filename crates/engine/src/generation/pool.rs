//! Bounded worker pool that runs terrain generation off the tick thread.
//!
//! There is one pipeline. [`GenerationPool::submit`] queues a chunk and
//! returns; [`GenerationPool::generate_blocking`] queues the same kind of task
//! with a completion signal attached and waits on it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::{GenContext, TerrainGenerator};
use crate::world::chunk::{Chunk, ChunkState};
use crate::world::position::ChunkPos;

struct GenTask {
    chunk: Arc<Chunk>,
    /// Fired with `true` if the chunk is `Ready` when the task is done.
    done: Option<Sender<bool>>,
}

pub struct GenerationPool {
    tasks: Option<Sender<GenTask>>,
    ready: Receiver<ChunkPos>,
    stop: Arc<AtomicBool>,
    generated: Arc<AtomicU64>,
    workers: Vec<JoinHandle<()>>,
}

impl GenerationPool {
    /// Spawn `workers` threads (at least one) sharing a queue of `capacity`.
    pub fn new(
        workers: usize,
        capacity: usize,
        generator: Arc<TerrainGenerator>,
        ctx: Arc<GenContext>,
    ) -> Self {
        let (task_tx, task_rx) = bounded::<GenTask>(capacity.max(1));
        let (ready_tx, ready_rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let generated = Arc::new(AtomicU64::new(0));

        let handles = (0..workers.max(1))
            .map(|i| {
                let rx = task_rx.clone();
                let ready_tx = ready_tx.clone();
                let generator = Arc::clone(&generator);
                let ctx = Arc::clone(&ctx);
                let stop = Arc::clone(&stop);
                let generated = Arc::clone(&generated);
                std::thread::Builder::new()
                    .name(format!("chunk-gen-worker-{i}"))
                    .spawn(move || {
                        tracing::debug!("Generation worker {} started", i);
                        while let Ok(task) = rx.recv() {
                            let ready = if stop.load(Ordering::Acquire) {
                                false
                            } else {
                                run_task(&task.chunk, &generator, &ctx, &ready_tx, &generated)
                            };
                            if let Some(done) = task.done {
                                let _ = done.send(ready);
                            }
                        }
                        tracing::debug!("Generation worker {} stopped", i);
                    })
                    .expect("failed to spawn chunk generation worker")
            })
            .collect();

        Self {
            tasks: Some(task_tx),
            ready: ready_rx,
            stop,
            generated,
            workers: handles,
        }
    }

    /// Queue `chunk` for generation. Blocks while the queue is full. False
    /// once the pool is shut down.
    pub fn submit(&self, chunk: Arc<Chunk>) -> bool {
        self.send(GenTask { chunk, done: None })
    }

    /// Queue `chunk` and wait until a worker has finished with it. Returns
    /// whether the chunk ended up `Ready`.
    pub fn generate_blocking(&self, chunk: Arc<Chunk>) -> bool {
        if chunk.is_ready() {
            return true;
        }
        let (done_tx, done_rx) = bounded(1);
        if !self.send(GenTask {
            chunk: Arc::clone(&chunk),
            done: Some(done_tx),
        }) {
            return false;
        }
        done_rx.recv().unwrap_or(false) || chunk.is_ready()
    }

    fn send(&self, task: GenTask) -> bool {
        match &self.tasks {
            Some(tx) if !self.stop.load(Ordering::Acquire) => tx.send(task).is_ok(),
            _ => false,
        }
    }

    /// Positions that became `Ready` since the last call.
    pub fn drain_ready(&self) -> Vec<ChunkPos> {
        self.ready.try_iter().collect()
    }

    pub fn generated_count(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> usize {
        self.tasks.as_ref().map_or(0, |tx| tx.len())
    }

    /// Stop accepting work, skip whatever is still queued, and join the
    /// workers. A task already running finishes first.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.tasks = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for GenerationPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_task(
    chunk: &Chunk,
    generator: &TerrainGenerator,
    ctx: &GenContext,
    ready_tx: &Sender<ChunkPos>,
    generated: &AtomicU64,
) -> bool {
    if chunk.state() != ChunkState::Generating {
        return chunk.is_ready();
    }
    let start = Instant::now();
    let storage = generator.generate(chunk.pos(), ctx).into_storage();
    if !chunk.commit(storage) {
        tracing::debug!("Discarded generated chunk {:?} (no longer needed)", chunk.pos());
        return chunk.is_ready();
    }
    generated.fetch_add(1, Ordering::Relaxed);
    tracing::trace!(
        "Generated chunk {:?} in {:?}",
        chunk.pos(),
        start.elapsed()
    );
    let _ = ready_tx.send(chunk.pos());
    true
}
