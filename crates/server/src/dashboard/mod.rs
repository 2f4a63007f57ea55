//! Live metrics dashboard.
//!
//! The tick thread bumps atomic counters in [`Metrics`] and publishes a
//! [`WorldStats`] snapshot through a `tokio::sync::watch` channel once per
//! tick. The axum server reads both at its own pace and never touches the
//! world.

pub mod metrics;
pub mod server;

use serde::Serialize;
use tokio::sync::watch;

pub use metrics::{Metrics, MetricsSnapshot};

/// World gauges as of the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorldStats {
    pub tick: u64,
    pub game_time: f64,
    pub chunks_loaded: u64,
    pub chunks_generated: u64,
    pub chunks_from_store: u64,
    pub chunks_unloaded: u64,
    pub entities: u64,
}

/// Shared between the tick thread and the web server via `Arc<DashboardState>`.
pub struct DashboardState {
    pub metrics: Metrics,
    world_tx: watch::Sender<WorldStats>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        let (world_tx, _) = watch::channel(WorldStats::default());
        Self {
            metrics: Metrics::new(),
            world_tx,
        }
    }

    /// Replace the published world stats. Never blocks.
    pub fn publish_world(&self, stats: WorldStats) {
        self.world_tx.send_replace(stats);
    }

    pub fn world(&self) -> WorldStats {
        *self.world_tx.borrow()
    }

    pub fn subscribe_world(&self) -> watch::Receiver<WorldStats> {
        self.world_tx.subscribe()
    }

    /// Counters and world gauges as one JSON document.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "metrics": self.metrics.snapshot(),
            "world": self.world(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_stats_are_visible_without_subscribers() {
        let state = DashboardState::new();
        state.publish_world(WorldStats {
            tick: 12,
            chunks_loaded: 25,
            ..Default::default()
        });
        assert_eq!(state.world().tick, 12);
        let json = state.to_json();
        assert_eq!(json["world"]["chunks_loaded"], 25);
        assert_eq!(json["metrics"]["ticks"], 0);
    }
}
