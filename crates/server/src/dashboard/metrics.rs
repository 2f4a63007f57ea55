//! Lock-free server counters.
//!
//! The tick thread and connection tasks update these with relaxed atomics;
//! the dashboard reads them whenever it likes.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

pub struct Metrics {
    ticks: AtomicU64,
    tick_ns_sum: AtomicU64,
    slowest_tick_ns: AtomicU64,

    // Tick duration histogram
    hist_under_1ms: AtomicU64,
    hist_1_5ms: AtomicU64,
    hist_5_20ms: AtomicU64,
    hist_20_50ms: AtomicU64,
    hist_over_50ms: AtomicU64,

    players_connected: AtomicU64,
    joins_rejected: AtomicU64,
    messages_in: AtomicU64,
    blocks_changed: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            tick_ns_sum: AtomicU64::new(0),
            slowest_tick_ns: AtomicU64::new(0),
            hist_under_1ms: AtomicU64::new(0),
            hist_1_5ms: AtomicU64::new(0),
            hist_5_20ms: AtomicU64::new(0),
            hist_20_50ms: AtomicU64::new(0),
            hist_over_50ms: AtomicU64::new(0),
            players_connected: AtomicU64::new(0),
            joins_rejected: AtomicU64::new(0),
            messages_in: AtomicU64::new(0),
            blocks_changed: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_tick(&self, duration: Duration) {
        let ns = duration.as_nanos() as u64;
        self.ticks.fetch_add(1, Relaxed);
        self.tick_ns_sum.fetch_add(ns, Relaxed);
        self.slowest_tick_ns.fetch_max(ns, Relaxed);

        let bucket = match duration.as_millis() {
            0 => &self.hist_under_1ms,
            1..=4 => &self.hist_1_5ms,
            5..=19 => &self.hist_5_20ms,
            20..=49 => &self.hist_20_50ms,
            _ => &self.hist_over_50ms,
        };
        bucket.fetch_add(1, Relaxed);
    }

    pub fn player_joined(&self) {
        self.players_connected.fetch_add(1, Relaxed);
    }

    pub fn player_left(&self) {
        self.players_connected.fetch_sub(1, Relaxed);
    }

    pub fn join_rejected(&self) {
        self.joins_rejected.fetch_add(1, Relaxed);
    }

    pub fn message_received(&self) {
        self.messages_in.fetch_add(1, Relaxed);
    }

    pub fn block_changed(&self) {
        self.blocks_changed.fetch_add(1, Relaxed);
    }

    pub fn players(&self) -> u64 {
        self.players_connected.load(Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            ticks: self.ticks.load(Relaxed),
            tick_ns_sum: self.tick_ns_sum.load(Relaxed),
            slowest_tick_ns: self.slowest_tick_ns.load(Relaxed),
            players: self.players_connected.load(Relaxed),
            joins_rejected: self.joins_rejected.load(Relaxed),
            messages_in: self.messages_in.load(Relaxed),
            blocks_changed: self.blocks_changed.load(Relaxed),
            hist: [
                self.hist_under_1ms.load(Relaxed),
                self.hist_1_5ms.load(Relaxed),
                self.hist_5_20ms.load(Relaxed),
                self.hist_20_50ms.load(Relaxed),
                self.hist_over_50ms.load(Relaxed),
            ],
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters. Rates come from diffing two of these.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub ticks: u64,
    pub tick_ns_sum: u64,
    pub slowest_tick_ns: u64,
    pub players: u64,
    pub joins_rejected: u64,
    pub messages_in: u64,
    pub blocks_changed: u64,
    /// `[<1ms, 1-5ms, 5-20ms, 20-50ms, >50ms]`
    pub hist: [u64; 5],
}
