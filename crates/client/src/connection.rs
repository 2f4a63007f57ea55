//! Connection to a voxelcraft server.
//!
//! After the join handshake the stream is split between two background
//! tasks: a reader that routes `Response` messages to the waiting
//! [`Connection::request`] call and queues everything else, and a writer that
//! drains the outbound queue. Any I/O failure, or an RPC that outlives its
//! timeout, closes the connection for good.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use glam::DVec3;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;
use voxelcraft_engine::protocol::messages::{RequestBody, ResponseBody};
use voxelcraft_engine::protocol::{
    read_message, write_message, ClientMessage, ProtocolError, ServerMessage, PROTOCOL_VERSION,
};
use voxelcraft_engine::world::position::ChunkDims;

use crate::{ClientError, REQUEST_TIMEOUT};

/// What the server told us when it accepted the join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    pub player_id: Uuid,
    pub spawn: DVec3,
    /// Server state descriptors, indexed by global state id.
    pub palette: Vec<String>,
    pub chunk_dims: ChunkDims,
    pub ticks_per_second: u32,
    pub render_distance: u32,
}

type Pending = Arc<DashMap<u64, oneshot::Sender<ResponseBody>>>;

pub struct Connection {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    pending: Pending,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
    request_timeout: Duration,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Open a TCP connection to `addr` and join as `name`. `timeout` bounds
    /// the TCP connect and the join round trip separately.
    pub async fn connect(addr: &str, name: &str, timeout: Duration) -> Result<(Self, JoinInfo), ClientError> {
        tracing::info!("Connecting to {} as {}", addr, name);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout("TCP connect"))?
            .map_err(ClientError::Connect)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not disable Nagle: {}", e);
        }
        Self::join(stream, name, timeout).await
    }

    /// Run the join handshake over an already open stream.
    pub async fn join<S>(stream: S, name: &str, timeout: Duration) -> Result<(Self, JoinInfo), ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let join = ClientMessage::Join {
            protocol_version: PROTOCOL_VERSION,
            name: name.to_string(),
        };
        tokio::time::timeout(timeout, write_message(&mut writer, &join))
            .await
            .map_err(|_| ClientError::Timeout("join request"))??;

        let reply = tokio::time::timeout(timeout, read_message::<_, ServerMessage>(&mut reader))
            .await
            .map_err(|_| ClientError::Timeout("join reply"))??;
        let info = match reply {
            ServerMessage::JoinAccepted {
                player_id,
                spawn,
                palette,
                chunk_dims,
                ticks_per_second,
                render_distance,
            } => JoinInfo {
                player_id,
                spawn,
                palette,
                chunk_dims,
                ticks_per_second,
                render_distance,
            },
            ServerMessage::JoinRejected { reason } => {
                tracing::warn!("Server rejected the join: {}", reason);
                return Err(ClientError::Rejected(reason));
            }
            other => {
                return Err(ClientError::Rejected(format!(
                    "server answered Join with {other:?}"
                )));
            }
        };
        tracing::info!(
            "Joined as {} ({} block states, render distance {})",
            info.player_id,
            info.palette.len(),
            info.render_distance
        );

        let pending: Pending = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));
        let (in_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, out_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(reader, in_tx, Arc::clone(&pending), Arc::clone(&closed)));
        let writer = tokio::spawn(write_loop(writer, out_rx, Arc::clone(&closed)));

        let connection = Self {
            outbound,
            inbound,
            pending,
            next_id: AtomicU64::new(1),
            closed,
            request_timeout: REQUEST_TIMEOUT,
            reader,
            writer,
        };
        Ok((connection, info))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn send(&self, message: ClientMessage) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        self.outbound.send(message).map_err(|_| ClientError::Closed)
    }

    /// Next server message. `None` once the connection is closed and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.inbound.recv().await
    }

    /// Next queued server message without waiting.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.inbound.try_recv().ok()
    }

    /// Send a request and wait for the response with the same id.
    pub async fn request(&self, body: RequestBody) -> Result<ResponseBody, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        if let Err(e) = self.send(ClientMessage::Request { id, body }) {
            self.pending.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => {
                self.pending.remove(&id);
                tracing::warn!(
                    "Request {} got no response within {:?}, closing the connection",
                    id,
                    self.request_timeout
                );
                self.close();
                Err(ClientError::Timeout("response"))
            }
        }
    }

    /// Tear the connection down without saying goodbye.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.reader.abort();
        self.writer.abort();
        self.pending.clear();
    }

    /// Send `Leave` and wait (briefly) for it to reach the socket.
    pub async fn leave(mut self) {
        if self.send(ClientMessage::Leave).is_ok() {
            let _ = tokio::time::timeout(Duration::from_secs(1), &mut self.writer).await;
        }
        self.close();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop<S>(
    mut reader: ReadHalf<S>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
    pending: Pending,
    closed: Arc<AtomicBool>,
) where
    S: AsyncRead,
{
    loop {
        match read_message::<_, ServerMessage>(&mut reader).await {
            Ok(ServerMessage::Response { id, body }) => match pending.remove(&id) {
                Some((_, tx)) => {
                    let _ = tx.send(body);
                }
                None => tracing::debug!("Response to unknown request {}", id),
            },
            Ok(message) => {
                let last = matches!(message, ServerMessage::Disconnect { .. });
                if inbound.send(message).is_err() || last {
                    break;
                }
            }
            Err(ProtocolError::ConnectionClosed) => {
                tracing::info!("Server closed the connection");
                break;
            }
            Err(e) => {
                tracing::warn!("Connection failed: {}", e);
                break;
            }
        }
    }
    closed.store(true, Ordering::Release);
    // Dropping the senders fails every outstanding request.
    pending.clear();
}

async fn write_loop<S>(
    mut writer: WriteHalf<S>,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    closed: Arc<AtomicBool>,
) where
    S: AsyncWrite,
{
    while let Some(message) = outbound.recv().await {
        if let Err(e) = write_message(&mut writer, &message).await {
            tracing::warn!("Send failed: {}", e);
            closed.store(true, Ordering::Release);
            return;
        }
        if matches!(message, ClientMessage::Leave) {
            break;
        }
    }
    let _ = writer.shutdown().await;
}
