//! Registry of live relay connections.

use std::collections::HashMap;

use parking_lot::RwLock;
use relay_common::PeerId;

use super::error::RelayError;
use super::session::OutboundQueue;

/// Shared mapping from identity to outbound queue.
///
/// A single `parking_lot::RwLock` keeps register, deregister, lookup and
/// snapshot linearizable with respect to each other. The lock is never held
/// across an await point; delivery always works on a snapshot.
pub struct ConnectionRegistry {
    peers: RwLock<HashMap<PeerId, OutboundQueue>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Make a session eligible to receive messages.
    pub fn register(&self, peer_id: PeerId, queue: OutboundQueue) -> Result<(), RelayError> {
        let mut peers = self.peers.write();
        if peers.contains_key(&peer_id) {
            return Err(RelayError::DuplicateIdentity(peer_id));
        }
        peers.insert(peer_id, queue);
        Ok(())
    }

    /// Remove a session. Returns `false` if it was not registered, which is
    /// not an error: disconnect may be observed more than once.
    pub fn deregister(&self, peer_id: &PeerId) -> bool {
        self.peers.write().remove(peer_id).is_some()
    }

    pub fn lookup(&self, peer_id: &PeerId) -> Option<OutboundQueue> {
        self.peers.read().get(peer_id).cloned()
    }

    /// Point-in-time copy of every registered session.
    pub fn snapshot(&self) -> Vec<(PeerId, OutboundQueue)> {
        self.peers
            .read()
            .iter()
            .map(|(id, queue)| (*id, queue.clone()))
            .collect()
    }

    /// Identities only, for views that must not expose queue handles.
    pub fn identities(&self) -> Vec<PeerId> {
        self.peers.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;

    fn queue() -> OutboundQueue {
        mpsc::channel(4).0
    }

    #[test]
    fn register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let id = PeerId::generate();
        registry.register(id, queue()).unwrap();

        assert!(registry.lookup(&id).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(&PeerId::generate()).is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = ConnectionRegistry::new();
        let id = PeerId::generate();
        registry.register(id, queue()).unwrap();

        let err = registry.register(id, queue()).unwrap_err();
        assert!(matches!(err, RelayError::DuplicateIdentity(dup) if dup == id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let id = PeerId::generate();
        registry.register(id, queue()).unwrap();

        assert!(registry.deregister(&id));
        assert!(!registry.deregister(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let registry = ConnectionRegistry::new();
        let a = PeerId::generate();
        registry.register(a, queue()).unwrap();

        let snapshot = registry.snapshot();

        let b = PeerId::generate();
        registry.register(b, queue()).unwrap();
        registry.deregister(&a);

        let ids: Vec<PeerId> = snapshot.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![a]);
        assert_eq!(registry.identities(), vec![b]);
    }

    #[test]
    fn concurrent_register_deregister_leaves_exact_set() {
        let registry = Arc::new(ConnectionRegistry::new());
        let threads = 8;
        let per_thread = 200;

        let kept: Vec<HashSet<PeerId>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let registry = registry.clone();
                    scope.spawn(move || {
                        let mut kept = HashSet::new();
                        for i in 0..per_thread {
                            let id = PeerId::generate();
                            registry.register(id, queue()).unwrap();
                            // Drop every other registration again.
                            if i % 2 == 0 {
                                assert!(registry.deregister(&id));
                                assert!(!registry.deregister(&id));
                            } else {
                                kept.insert(id);
                            }
                        }
                        kept
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let expected: HashSet<PeerId> = kept.into_iter().flatten().collect();
        let snapshot = registry.snapshot();
        let actual: HashSet<PeerId> = snapshot.iter().map(|(id, _)| *id).collect();

        assert_eq!(snapshot.len(), actual.len(), "snapshot contains duplicates");
        assert_eq!(actual, expected);
        assert_eq!(registry.len(), threads * per_thread / 2);
    }
}
