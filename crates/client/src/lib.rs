//! Headless voxelcraft client.
//!
//! [`connection::Connection`] speaks the wire protocol and correlates RPC
//! responses; [`world::ClientWorld`] mirrors the chunks the server streams;
//! [`player::ClientPlayer`] predicts local movement with the engine's own
//! physics and is corrected by [`prediction::reconcile`]. [`client::Client`]
//! ties the pieces together without owning any I/O, so a renderer (or the
//! headless binary) drives it.

pub mod client;
pub mod connection;
pub mod player;
pub mod prediction;
pub mod world;

use std::time::Duration;

use thiserror::Error;
use voxelcraft_engine::protocol::ProtocolError;

pub use client::{Client, Status};
pub use connection::{Connection, JoinInfo};

/// How long an RPC waits for its response before the connection is
/// considered dead.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect: {0}")]
    Connect(#[source] std::io::Error),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("join rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("connection closed")]
    Closed,
}
