//! Dedicated voxelcraft server.
//!
//! Network tasks run on tokio and talk to the single [`tick::TickLoop`]
//! thread through the [`event_queue`]; the tick thread answers through each
//! session's outbound queue. Chunks and players are saved by
//! [`persistence::RegionStore`].

pub mod config;
pub mod dashboard;
pub mod event_queue;
pub mod logging;
pub mod net;
pub mod persistence;
pub mod session;
pub mod tick;
