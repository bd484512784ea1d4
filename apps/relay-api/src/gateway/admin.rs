//! Administrative operations, independent of the HTTP layer that exposes them.

use relay_common::PeerId;

use super::error::RelayError;
use super::events::Envelope;
use super::fanout::Fanout;
use super::registry::ConnectionRegistry;

/// Validate `body` as an envelope and broadcast it to every connected peer.
///
/// Success means the envelope was accepted, not that anyone received it.
pub async fn admin_broadcast(fanout: &Fanout, body: &[u8]) -> Result<(), RelayError> {
    let envelope = Envelope::decode(body)?;
    let report = fanout.broadcast(PeerId::SYSTEM, envelope).await;
    tracing::info!(
        delivered = report.delivered,
        dropped = report.dropped,
        "admin broadcast"
    );
    Ok(())
}

/// Identities of every connected peer.
pub fn admin_list(registry: &ConnectionRegistry) -> Vec<PeerId> {
    let mut peers = registry.identities();
    peers.sort();
    peers
}

/// Send `body` to the peer named by `peer_id`.
pub async fn admin_send(fanout: &Fanout, peer_id: &str, body: &[u8]) -> Result<(), RelayError> {
    let target: PeerId = peer_id
        .parse()
        .map_err(|_| RelayError::InvalidIdentity(peer_id.to_string()))?;
    let envelope = Envelope::decode(body)?;
    fanout.send(target, envelope).await?;
    tracing::info!(peer_id = %target, "admin send");
    Ok(())
}
