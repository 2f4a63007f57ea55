//! Connected players, owned by the tick thread.
//!
//! Each [`Session`] pairs a connection with its player entity, the viewport
//! the client currently holds, and the chunks it is still waiting for.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use voxelcraft_engine::protocol::ServerMessage;
use voxelcraft_engine::viewport::Viewport;
use voxelcraft_engine::world::position::ChunkPos;

use crate::event_queue::{Outbound, SessionId};

pub struct Session {
    pub id: SessionId,
    pub name: String,
    /// Entity id of the player in the world.
    pub player: Uuid,
    outbound: Outbound,
    /// Chunks the client has been told to hold (sent or pending).
    pub viewport: Option<Viewport>,
    /// Requested chunks not yet sent because they were still generating.
    pub pending: HashSet<ChunkPos>,
    pub last_input_seq: u32,
}

impl Session {
    pub fn new(id: SessionId, name: String, player: Uuid, outbound: Outbound) -> Self {
        Self {
            id,
            name,
            player,
            outbound,
            viewport: None,
            pending: HashSet::new(),
            last_input_seq: 0,
        }
    }

    /// Queue a message for the write loop. False once the connection is gone.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbound.send(message).is_ok()
    }

    pub fn is_connected(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Whether the client holds (or is about to receive) `pos`.
    pub fn views(&self, pos: ChunkPos) -> bool {
        self.viewport.is_some_and(|v| v.contains(pos))
    }
}

/// Stable player id for a name, so a returning player gets their saved
/// entity back.
pub fn offline_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_URL, format!("voxelcraft:player:{name}").as_bytes())
}

#[derive(Default)]
pub struct Sessions {
    sessions: HashMap<SessionId, Session>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        tracing::debug!("Session {} bound to player {}", session.id, session.player);
        self.sessions.insert(session.id, session);
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Session> {
        self.sessions.values().find(|s| s.name == name)
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn send(&self, id: SessionId, message: ServerMessage) -> bool {
        self.sessions.get(&id).is_some_and(|s| s.send(message))
    }

    pub fn broadcast(&self, message: &ServerMessage) {
        for session in self.sessions.values() {
            session.send(message.clone());
        }
    }

    /// Send to every session whose viewport contains `pos`.
    pub fn broadcast_to_viewers(&self, pos: ChunkPos, message: &ServerMessage) {
        for session in self.sessions.values().filter(|s| s.views(pos)) {
            session.send(message.clone());
        }
    }

    /// Whether any session other than `except` still views `pos`.
    pub fn viewed_by_others(&self, pos: ChunkPos, except: SessionId) -> bool {
        self.sessions.values().any(|s| s.id != except && s.views(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn session(id: SessionId, name: &str) -> (Session, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new(id, name.to_string(), offline_uuid(name), tx), rx)
    }

    #[test]
    fn offline_uuid_is_stable_per_name() {
        assert_eq!(offline_uuid("steve"), offline_uuid("steve"));
        assert_ne!(offline_uuid("steve"), offline_uuid("alex"));
        assert_eq!(offline_uuid("steve").get_version_num(), 3);
    }

    #[test]
    fn broadcast_reaches_viewers_only() {
        let mut sessions = Sessions::new();
        let (mut near, mut near_rx) = session(1, "near");
        let (mut far, mut far_rx) = session(2, "far");
        near.viewport = Some(Viewport::square(ChunkPos::new(0, 0), 1));
        far.viewport = Some(Viewport::square(ChunkPos::new(10, 10), 1));
        sessions.insert(near);
        sessions.insert(far);

        let update = ServerMessage::UnloadChunk {
            pos: ChunkPos::new(1, 1),
        };
        sessions.broadcast_to_viewers(ChunkPos::new(1, 1), &update);
        assert_eq!(near_rx.try_recv().unwrap(), update);
        assert!(far_rx.try_recv().is_err());

        assert!(sessions.viewed_by_others(ChunkPos::new(0, 0), 2));
        assert!(!sessions.viewed_by_others(ChunkPos::new(0, 0), 1));
    }

    #[test]
    fn send_fails_after_the_connection_drops() {
        let mut sessions = Sessions::new();
        let (s, rx) = session(7, "gone");
        sessions.insert(s);
        assert!(sessions.get(7).unwrap().is_connected());
        drop(rx);
        assert!(!sessions.send(7, ServerMessage::Disconnect { reason: "x".into() }));
        assert!(!sessions.get(7).unwrap().is_connected());
        assert!(sessions.by_name("gone").is_some());
        assert!(sessions.remove(7).is_some());
        assert!(sessions.is_empty());
    }
}
