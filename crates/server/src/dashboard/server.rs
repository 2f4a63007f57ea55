//! axum web server for the dashboard.
//!
//! `/metrics` returns the current counters and world gauges as JSON. `/ws`
//! sends that document once, then streams counter and gauge updates.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

use super::DashboardState;

pub fn router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Serve the dashboard until the listener fails. Bind errors are logged, not
/// returned: the game server keeps running without a dashboard.
pub async fn start(state: Arc<DashboardState>, port: u16) {
    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Dashboard failed to bind to {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("Dashboard listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!("Dashboard server error: {}", e);
    }
}

async fn metrics(State(state): State<Arc<DashboardState>>) -> Json<serde_json::Value> {
    Json(state.to_json())
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<DashboardState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One full document on connect, then metrics every 200 ms plus the world
/// gauges whenever the tick thread has published new ones since.
async fn handle_socket(mut socket: WebSocket, state: Arc<DashboardState>) {
    let mut world_rx = state.subscribe_world();
    let hello = serde_json::json!({ "type": "full", "data": state.to_json() });
    if send_json(&mut socket, &hello).await.is_err() {
        return;
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let metrics = serde_json::json!({
                    "type": "metrics",
                    "data": state.metrics.snapshot(),
                });
                if send_json(&mut socket, &metrics).await.is_err() {
                    break;
                }
                if world_rx.has_changed().unwrap_or(false) {
                    let world = *world_rx.borrow_and_update();
                    let msg = serde_json::json!({ "type": "world", "data": world });
                    if send_json(&mut socket, &msg).await.is_err() {
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
    tracing::debug!("Dashboard client disconnected");
}

async fn send_json(socket: &mut WebSocket, value: &serde_json::Value) -> Result<(), ()> {
    let text = value.to_string();
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}
