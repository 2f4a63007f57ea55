//! Per-connection actor.
//!
//! `Join` must arrive first, within the join timeout. After that the
//! connection runs two halves: a read loop forwarding every decoded
//! [`ClientMessage`] into the tick thread's queue, and a write loop draining
//! the session's outbound queue onto the socket. Whichever side fails first
//! ends the session with a `Disconnected` event.

use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use voxelcraft_engine::protocol::{
    read_message, write_message, ClientMessage, ProtocolError, ServerMessage, PROTOCOL_VERSION,
};

use crate::event_queue::{ClientEvent, SessionId};

pub async fn handle<S>(
    stream: S,
    session: SessionId,
    events: Sender<ClientEvent>,
    join_timeout: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let first = tokio::time::timeout(join_timeout, read_message::<_, ClientMessage>(&mut reader))
        .await
        .context("no Join before the timeout")?
        .context("reading Join")?;

    let name = match first {
        ClientMessage::Join {
            protocol_version,
            name,
        } if protocol_version == PROTOCOL_VERSION => name,
        ClientMessage::Join {
            protocol_version, ..
        } => {
            let reason = format!(
                "protocol version {} is not supported (server speaks {})",
                protocol_version, PROTOCOL_VERSION
            );
            tracing::info!("Session {} rejected: {}", session, reason);
            return reject(&mut writer, reason).await;
        }
        other => {
            tracing::debug!("Session {} opened with {:?}", session, other);
            return reject(&mut writer, "expected Join as the first message".to_string()).await;
        }
    };

    let (outbound, rx) = mpsc::unbounded_channel();
    if events
        .send(ClientEvent::Connected {
            session,
            name,
            outbound,
        })
        .is_err()
    {
        return reject(&mut writer, "server is shutting down".to_string()).await;
    }

    let mut write_task = tokio::spawn(write_loop(writer, rx));
    let reason = tokio::select! {
        reason = read_loop(&mut reader, session, &events) => reason,
        result = &mut write_task => match result {
            Ok(Ok(())) => "closed by server".to_string(),
            Ok(Err(e)) => format!("write failed: {}", e),
            Err(e) => format!("write task failed: {}", e),
        },
    };

    tracing::debug!("Session {} ended: {}", session, reason);
    let _ = events.send(ClientEvent::Disconnected { session, reason });
    Ok(())
}

async fn reject<S>(writer: &mut WriteHalf<S>, reason: String) -> Result<()>
where
    S: AsyncWrite,
{
    write_message(writer, &ServerMessage::JoinRejected { reason }).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Forward messages until the peer leaves or the stream breaks. Returns why.
async fn read_loop<S>(
    reader: &mut ReadHalf<S>,
    session: SessionId,
    events: &Sender<ClientEvent>,
) -> String
where
    S: AsyncRead,
{
    loop {
        match read_message::<_, ClientMessage>(reader).await {
            Ok(message) => {
                let leaving = matches!(message, ClientMessage::Leave);
                if events.send(ClientEvent::Message { session, message }).is_err() {
                    return "server is shutting down".to_string();
                }
                if leaving {
                    return "left the game".to_string();
                }
            }
            Err(ProtocolError::ConnectionClosed) => return "connection closed".to_string(),
            Err(e) => return e.to_string(),
        }
    }
}

/// Write queued messages in order. Stops after a rejection or disconnect, or
/// when the session is dropped.
async fn write_loop<S>(
    mut writer: WriteHalf<S>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<(), ProtocolError>
where
    S: AsyncWrite,
{
    while let Some(message) = rx.recv().await {
        write_message(&mut writer, &message).await?;
        if matches!(
            message,
            ServerMessage::JoinRejected { .. } | ServerMessage::Disconnect { .. }
        ) {
            break;
        }
    }
    writer.shutdown().await?;
    Ok(())
}
