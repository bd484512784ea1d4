//! Per-connection session state and its two flows.
//!
//! The inbound flow reads frames from the socket and feeds the fan-out
//! engine. The outbound flow drains the session's queue onto the socket.
//! Only the inbound flow decides when the session ends.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use relay_common::PeerId;
use tokio::sync::{mpsc, oneshot};

use super::error::RelayError;
use super::events::{ClientMessage, Envelope};
use super::fanout::Fanout;

/// Producer side of a session's bounded outbound queue.
pub type OutboundQueue = mpsc::Sender<Arc<Envelope>>;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Registered,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Registered) | (Registered, Active) | (Active, Closing) | (Closing, Closed)
        )
    }
}

/// State for a single WebSocket connection, owned by its lifecycle task.
pub struct ConnectionSession {
    pub peer_id: PeerId,
    state: SessionState,
    queue: Option<OutboundQueue>,
    close_tx: Option<oneshot::Sender<()>>,
}

/// Consumer side handed to the outbound flow.
pub struct OutboundFlow {
    pub peer_id: PeerId,
    queue: mpsc::Receiver<Arc<Envelope>>,
    closed: oneshot::Receiver<()>,
}

impl ConnectionSession {
    /// Create a session in `Connecting` with a queue of `capacity` slots.
    pub fn open(peer_id: PeerId, capacity: usize) -> (Self, OutboundFlow) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (close_tx, close_rx) = oneshot::channel();
        let session = Self {
            peer_id,
            state: SessionState::Connecting,
            queue: Some(tx),
            close_tx: Some(close_tx),
        };
        let flow = OutboundFlow {
            peer_id,
            queue: rx,
            closed: close_rx,
        };
        (session, flow)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn advance(&mut self, next: SessionState) -> Result<(), RelayError> {
        if !self.state.can_advance_to(next) {
            return Err(RelayError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(peer_id = %self.peer_id, from = ?self.state, to = ?next, "session transition");
        self.state = next;
        Ok(())
    }

    /// The session's own queue handle. `None` once the queue is closed.
    pub fn queue(&self) -> Option<&OutboundQueue> {
        self.queue.as_ref()
    }

    /// Close the outbound queue and tell the outbound flow to stop.
    /// Calling it again does nothing.
    pub fn close_outbound(&mut self) {
        self.queue = None;
        if let Some(close_tx) = self.close_tx.take() {
            // The outbound flow may already be gone after a write failure.
            let _ = close_tx.send(());
        }
    }
}

/// Read frames until the stream ends or fails.
///
/// Returns the reason the stream terminated. Malformed frames are logged and
/// skipped; if `max_malformed` is set, that many consecutive malformed frames
/// end the flow as well.
pub async fn run_inbound<S, E>(
    peer_id: PeerId,
    ws_rx: &mut S,
    own_queue: &OutboundQueue,
    fanout: &Fanout,
    max_malformed: Option<u32>,
) -> RelayError
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut malformed = 0u32;

    loop {
        let frame = match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => ClientMessage::decode(text.as_str()),
            Some(Ok(Message::Binary(bytes))) => ClientMessage::decode(&bytes),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) => {
                return RelayError::StreamTerminated("closed by client".into())
            }
            Some(Err(e)) => return RelayError::StreamTerminated(e.to_string()),
            None => return RelayError::StreamTerminated("end of stream".into()),
        };

        let msg = match frame {
            Ok(msg) => {
                malformed = 0;
                msg
            }
            Err(err) => {
                malformed += 1;
                tracing::warn!(peer_id = %peer_id, %err, "dropping malformed message");
                if max_malformed.is_some_and(|limit| malformed >= limit) {
                    return RelayError::StreamTerminated(format!(
                        "{malformed} consecutive malformed messages"
                    ));
                }
                continue;
            }
        };

        tracing::debug!(peer_id = %peer_id, ?msg, "received");

        match msg {
            ClientMessage::Ping => {
                if let Err(err) = fanout.deliver(peer_id, own_queue, Arc::new(Envelope::Pong)).await {
                    tracing::warn!(%err, "pong dropped");
                }
            }
            ClientMessage::Text { text } => {
                let envelope = Envelope::Text {
                    sender: peer_id,
                    body: text,
                };
                fanout.broadcast(peer_id, envelope).await;
            }
        }
    }
}

/// Write queued envelopes to the socket until the queue closes, the close
/// signal fires, or a write fails.
pub async fn run_outbound<W>(mut flow: OutboundFlow, mut ws_tx: W)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    loop {
        // Envelopes already queued go out before the close signal is honoured.
        let envelope = tokio::select! {
            biased;
            next = flow.queue.recv() => match next {
                Some(envelope) => envelope,
                None => break,
            },
            _ = &mut flow.closed => break,
        };

        tracing::debug!(peer_id = %flow.peer_id, ?envelope, "sending");
        if let Err(e) = ws_tx.send(Message::Text(envelope.encode().into())).await {
            tracing::debug!(peer_id = %flow.peer_id, error = %e, "ws write failed");
            return;
        }
    }

    let _ = ws_tx.close().await;
}
