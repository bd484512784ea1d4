//! WebSocket upgrade handler and per-connection lifecycle.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use relay_common::PeerId;

use crate::AppState;

use super::events::Envelope;
use super::session::{run_inbound, run_outbound, ConnectionSession, SessionState};

/// Close code sent when the relay refuses a connection (4000-range for
/// application-level).
const CLOSE_REGISTRATION_FAILED: u16 = 4000;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/connect", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Accept a connection under a freshly generated identity.
pub async fn handle_connection(socket: WebSocket, state: AppState) {
    handle_connection_with(socket, state, PeerId::generate()).await
}

/// Drive one connection through
/// `Connecting → Registered → Active → Closing → Closed` as `peer_id`.
pub async fn handle_connection_with(socket: WebSocket, state: AppState, peer_id: PeerId) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (mut session, outbound) = ConnectionSession::open(peer_id, state.config.queue_capacity);
    let Some(queue) = session.queue().cloned() else {
        return;
    };

    // The queue is not shared yet, so the assignment always fits and nothing
    // published after registration can get ahead of it.
    if let Err(err) = queue.try_send(Arc::new(Envelope::AssignIdentity { id: peer_id })) {
        tracing::error!(peer_id = %peer_id, %err, "could not enqueue identity assignment");
        return;
    }

    // Connecting → Registered.
    if let Err(err) = state.registry.register(peer_id, queue.clone()) {
        tracing::error!(%err, "registration rejected");
        let _ = send_close(&mut ws_tx, CLOSE_REGISTRATION_FAILED, "Registration failed").await;
        return;
    }
    transition(&mut session, SessionState::Registered);

    tracing::info!(peer_id = %peer_id, peers = state.registry.len(), "peer connected");

    // Registered → Active. The join announcement goes out before either flow
    // starts.
    state
        .fanout
        .broadcast(peer_id, Envelope::PeerJoined { id: peer_id })
        .await;
    transition(&mut session, SessionState::Active);

    let writer = tokio::spawn(run_outbound(outbound, ws_tx));
    let reason = run_inbound(
        peer_id,
        &mut ws_rx,
        &queue,
        &state.fanout,
        state.config.max_malformed,
    )
    .await;
    drop(queue);

    // Active → Closing. Deregister first so no new fan-out can pick this
    // session up, then stop the writer, then announce.
    transition(&mut session, SessionState::Closing);
    tracing::info!(peer_id = %peer_id, %reason, "peer disconnected");

    state.registry.deregister(&peer_id);
    session.close_outbound();
    state
        .fanout
        .broadcast(peer_id, Envelope::PeerLeft { id: peer_id })
        .await;

    // Closing → Closed once the writer has returned.
    if let Err(e) = writer.await {
        tracing::debug!(?e, peer_id = %peer_id, "outbound task failed");
    }
    transition(&mut session, SessionState::Closed);
}

fn transition(session: &mut ConnectionSession, next: SessionState) {
    if let Err(err) = session.advance(next) {
        tracing::error!(peer_id = %session.peer_id, %err, "unexpected session transition");
    }
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
