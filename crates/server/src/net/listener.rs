use std::time::Duration;

use crossbeam_channel::Sender;
use tokio::net::TcpListener;

use crate::event_queue::{ClientEvent, SessionId};

/// Accept connections forever, giving each its own session id and task.
pub async fn run(
    listener: TcpListener,
    events: Sender<ClientEvent>,
    join_timeout: Duration,
) -> anyhow::Result<()> {
    tracing::info!("Listening on {}", listener.local_addr()?);
    let mut next_session: SessionId = 1;

    loop {
        let (stream, addr) = listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not disable Nagle for {}: {}", addr, e);
        }
        let session = next_session;
        next_session += 1;
        tracing::info!("Connection from {} (session {})", addr, session);

        let events = events.clone();
        tokio::spawn(async move {
            if let Err(e) = super::connection::handle(stream, session, events, join_timeout).await {
                tracing::warn!("Connection from {} closed: {:#}", addr, e);
            }
        });
    }
}
