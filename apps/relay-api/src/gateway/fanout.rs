//! Fan-out engine: delivers envelopes to registered sessions.
//!
//! Each session drains its own bounded queue, so a push here only ever waits
//! for that one recipient, and never longer than the delivery allowance. A
//! recipient whose queue stays full or has closed loses that message; the
//! rest of the fan-out is unaffected.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use relay_common::PeerId;
use tokio::sync::mpsc::error::SendTimeoutError;

use super::error::RelayError;
use super::events::Envelope;
use super::registry::ConnectionRegistry;
use super::session::OutboundQueue;

/// Outcome counts of a single fan-out, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Cloneable handle; store in AppState.
#[derive(Clone)]
pub struct Fanout {
    registry: Arc<ConnectionRegistry>,
    delivery_timeout: Duration,
}

impl Fanout {
    pub fn new(registry: Arc<ConnectionRegistry>, delivery_timeout: Duration) -> Self {
        Self {
            registry,
            delivery_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver to every registered session except `sender`.
    ///
    /// Pass [`PeerId::SYSTEM`] to reach every session.
    pub async fn broadcast(&self, sender: PeerId, envelope: Envelope) -> DeliveryReport {
        let envelope = Arc::new(envelope);
        let recipients: Vec<(PeerId, OutboundQueue)> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|(id, _)| *id != sender)
            .collect();

        tracing::debug!(
            sender = %sender,
            recipients = recipients.len(),
            envelope = ?envelope,
            "broadcasting"
        );

        let results = join_all(
            recipients
                .iter()
                .map(|(id, queue)| self.deliver(*id, queue, envelope.clone())),
        )
        .await;

        let mut report = DeliveryReport::default();
        for result in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(sender = %sender, %err, "broadcast delivery dropped");
                    report.dropped += 1;
                }
            }
        }
        report
    }

    /// Deliver to exactly one session.
    ///
    /// Fails only when `target` is not registered. A dropped delivery is
    /// logged and still reported as success.
    pub async fn send(&self, target: PeerId, envelope: Envelope) -> Result<(), RelayError> {
        let queue = self
            .registry
            .lookup(&target)
            .ok_or(RelayError::UnknownIdentity(target))?;

        tracing::debug!(peer_id = %target, envelope = ?envelope, "direct send");

        if let Err(err) = self.deliver(target, &queue, Arc::new(envelope)).await {
            tracing::warn!(%err, "direct delivery dropped");
        }
        Ok(())
    }

    /// Best-effort push onto one queue, bounded by the delivery allowance.
    pub async fn deliver(
        &self,
        peer_id: PeerId,
        queue: &OutboundQueue,
        envelope: Arc<Envelope>,
    ) -> Result<(), RelayError> {
        match queue.send_timeout(envelope, self.delivery_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(RelayError::DeliveryDropped {
                id: peer_id,
                reason: "queue full",
            }),
            Err(SendTimeoutError::Closed(_)) => Err(RelayError::DeliveryDropped {
                id: peer_id,
                reason: "queue closed",
            }),
        }
    }
}
