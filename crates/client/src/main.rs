//! Headless client: joins, walks in a square for a while, then leaves.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use voxelcraft_client::{Client, Connection, Status};
use voxelcraft_engine::entity::MoveInput;
use voxelcraft_engine::protocol::messages::{RequestBody, ResponseBody};
use voxelcraft_engine::protocol::ClientMessage;
use voxelcraft_engine::EngineContext;

const FRAME: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "voxelcraft-client", about = "Headless voxelcraft client")]
struct Args {
    /// Server address.
    #[arg(long, default_value = "127.0.0.1:25575")]
    server: String,

    #[arg(long, default_value = "bot")]
    name: String,

    /// How long to stay connected.
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true).with_timer(fmt::time::uptime()))
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let ctx = EngineContext::bootstrap().context("registering core content")?;
    let (mut connection, info) = Connection::connect(&args.server, &args.name, Duration::from_secs(10))
        .await
        .with_context(|| format!("joining {}", args.server))?;
    let mut client = Client::new(info, &args.name, &ctx);

    match connection.request(RequestBody::WorldInfo).await? {
        ResponseBody::WorldInfo { template, seed, players, .. } => {
            tracing::info!("World {} (seed {}), {} players online", template, seed, players)
        }
        other => tracing::warn!("Unexpected world info reply: {:?}", other),
    }

    let start = Instant::now();
    let deadline = Duration::from_secs(args.seconds);
    let mut frame = tokio::time::interval(FRAME);
    let mut last_report = Instant::now();

    'session: while start.elapsed() < deadline {
        frame.tick().await;
        while let Some(message) = connection.try_recv() {
            if let Status::Disconnected { reason } = client.handle_message(message) {
                tracing::warn!("Session ended: {}", reason);
                break 'session;
            }
        }
        if connection.is_closed() {
            tracing::warn!("Connection lost");
            break;
        }

        // Walk forward, turning a quarter every two seconds.
        let phase = start.elapsed().as_secs() / 2;
        let walk = MoveInput {
            forward: 1.0,
            ..MoveInput::default()
        };
        if let Some(message) = client.update(FRAME.as_secs_f64(), walk) {
            connection.send(message)?;
        }
        if last_report.elapsed() >= Duration::from_secs(2) {
            connection.send(ClientMessage::CameraDelta { yaw: 90.0, pitch: 0.0 })?;
            let p = client.player().position();
            let stats = client.stats();
            tracing::info!(
                "Leg {}: at ({:.2}, {:.2}, {:.2}), {} chunks held, {} snaps / {} blends",
                phase,
                p.x,
                p.y,
                p.z,
                client.world().chunk_count(),
                stats.snaps,
                stats.blends
            );
            last_report = Instant::now();
        }
    }

    connection.leave().await;
    tracing::info!("Left after {:.1?}", start.elapsed());
    Ok(())
}
