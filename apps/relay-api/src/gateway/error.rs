//! Error taxonomy for the relay core.

use relay_common::PeerId;
use thiserror::Error;

use super::session::SessionState;

#[derive(Debug, Error)]
pub enum RelayError {
    /// A registration collided with a live identity.
    #[error("identity {0} is already registered")]
    DuplicateIdentity(PeerId),

    /// An inbound frame did not decode into a known message.
    #[error("could not decode message: {0}")]
    DecodeFailure(String),

    /// A directed send named an identity that is not connected.
    #[error("no connected peer with identity {0}")]
    UnknownIdentity(PeerId),

    /// A recipient's queue was closed or stayed full past the allowance.
    #[error("delivery to {id} dropped: {reason}")]
    DeliveryDropped { id: PeerId, reason: &'static str },

    /// The underlying stream failed or was closed by the remote end.
    #[error("stream terminated: {0}")]
    StreamTerminated(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },
}
