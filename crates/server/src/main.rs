use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use voxelcraft_engine::registry::RegName;
use voxelcraft_engine::world::position::ChunkPos;
use voxelcraft_engine::world::store::ChunkStore;
use voxelcraft_engine::{EngineContext, World};
use voxelcraft_server::config::{CliArgs, ServerConfig};
use voxelcraft_server::dashboard::{self, DashboardState};
use voxelcraft_server::event_queue::EventQueue;
use voxelcraft_server::logging::init_logging;
use voxelcraft_server::persistence::{LevelInfo, RegionStore};
use voxelcraft_server::tick::{TickLoop, TickSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let mut config = ServerConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.apply_cli_overrides(&args);
    init_logging(&config.log_level);

    tracing::info!("Voxelcraft server starting");

    // ── Content and world ───────────────────────────────────────────────
    let ctx = EngineContext::bootstrap().context("registering core content")?;
    let level = LevelInfo::load_or_create(&config.world.dir, &config.world)?;
    let template_name = RegName::parse(&level.template)
        .with_context(|| format!("world template {:?}", level.template))?;
    let template = ctx
        .registry()
        .template(&template_name)
        .with_context(|| format!("unknown world template {}", template_name))?;

    let store: Arc<dyn ChunkStore> = Arc::new(RegionStore::open(&config.world.dir, Arc::clone(&ctx))?);
    let world = World::new(ctx, template, level.seed, store, config.generation_workers())
        .context("creating world")?;

    let start = Instant::now();
    world.prepare_area(ChunkPos::new(0, 0), config.world.spawn_radius);
    tracing::info!(
        "Spawn area ready: {} chunks in {:.2?}",
        world.chunk_count(),
        start.elapsed()
    );

    // ── Dashboard ───────────────────────────────────────────────────────
    let dashboard = Arc::new(DashboardState::new());
    if config.dashboard.enabled {
        let dash = Arc::clone(&dashboard);
        let port = config.dashboard.port;
        tokio::spawn(async move {
            dashboard::server::start(dash, port).await;
        });
    }

    // ── Tick thread ─────────────────────────────────────────────────────
    let events = EventQueue::new();
    let tick_loop = TickLoop::new(
        world,
        events.clone(),
        Arc::clone(&dashboard),
        TickSettings::from_config(&config),
    );
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    let tick_thread = std::thread::Builder::new()
        .name("tick".into())
        .spawn(move || tick_loop.run(stop_rx))
        .context("spawning tick thread")?;

    // ── Listener with graceful shutdown ─────────────────────────────────
    let listener = TcpListener::bind(&config.network.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.network.bind_addr))?;
    let join_timeout = Duration::from_secs(config.network.join_timeout_secs);

    tokio::select! {
        result = voxelcraft_server::net::listener::run(listener, events.sender(), join_timeout) => {
            if let Err(e) = result {
                tracing::error!("Listener error: {:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
        }
    }

    let _ = stop_tx.send(());
    tokio::task::spawn_blocking(move || tick_thread.join())
        .await
        .context("waiting for the tick thread")?
        .map_err(|_| anyhow::anyhow!("tick thread panicked"))?;

    tracing::info!("Server stopped");
    Ok(())
}
