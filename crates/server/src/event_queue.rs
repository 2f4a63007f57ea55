//! Client-to-server event queue.
//!
//! Connection tasks push [`ClientEvent`]s from the tokio runtime; the tick
//! thread drains the whole queue once per tick. Order is preserved per
//! connection. Server-to-client traffic goes the other way through each
//! session's [`Outbound`] sender.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::sync::mpsc;
use voxelcraft_engine::protocol::{ClientMessage, ServerMessage};

/// Connection id, unique for the lifetime of the process.
pub type SessionId = u64;

/// Per-session queue feeding the connection's write loop.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug)]
pub enum ClientEvent {
    /// A connection completed the join handshake and wants a player.
    Connected {
        session: SessionId,
        name: String,
        outbound: Outbound,
    },
    Message {
        session: SessionId,
        message: ClientMessage,
    },
    /// The connection is gone (EOF, I/O error or protocol error).
    Disconnected { session: SessionId, reason: String },
}

#[derive(Clone)]
pub struct EventQueue {
    tx: Sender<ClientEvent>,
    rx: Receiver<ClientEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<ClientEvent> {
        self.tx.clone()
    }

    pub fn push(&self, event: ClientEvent) {
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.tx.send(event);
    }

    /// Everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<ClientEvent> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelcraft_engine::protocol::messages::RequestBody;

    #[test]
    fn drain_preserves_order_and_empties() {
        let queue = EventQueue::new();
        let tx = queue.sender();
        for id in 0..3 {
            tx.send(ClientEvent::Message {
                session: 1,
                message: ClientMessage::Request {
                    id,
                    body: RequestBody::Ping,
                },
            })
            .unwrap();
        }
        queue.push(ClientEvent::Disconnected {
            session: 1,
            reason: "bye".into(),
        });
        assert_eq!(queue.len(), 4);

        let drained = queue.drain();
        let ids: Vec<u64> = drained
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Message {
                    message: ClientMessage::Request { id, .. },
                    ..
                } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(matches!(drained[3], ClientEvent::Disconnected { .. }));
        assert!(queue.is_empty());
    }
}
