//! Wire-format messages exchanged with relay clients.
//!
//! Every message is a JSON object with a `type` discriminator. The set of
//! kinds is closed; anything else fails to decode.

use relay_common::PeerId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::RelayError;

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// A message delivered to a client over its outbound queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    /// Reply to a client `PING`.
    Pong,
    /// Sent once, only to the owning session, right after registration.
    #[serde(rename = "ASSIGN_ID")]
    AssignIdentity {
        #[schema(value_type = String)]
        id: PeerId,
    },
    /// Another peer became active.
    #[serde(rename = "CONNECTED")]
    PeerJoined {
        #[schema(value_type = String)]
        id: PeerId,
    },
    /// A peer disconnected.
    #[serde(rename = "DISCONNECTED")]
    PeerLeft {
        #[schema(value_type = String)]
        id: PeerId,
    },
    /// User content.
    Text {
        #[schema(value_type = String)]
        sender: PeerId,
        #[serde(rename = "text")]
        body: String,
    },
}

impl Envelope {
    pub fn encode(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode an envelope supplied by the administrative surface.
    pub fn decode(bytes: &[u8]) -> Result<Self, RelayError> {
        serde_json::from_slice(bytes).map_err(|e| RelayError::MalformedRequest(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A message received from the client over WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Ping,
    Text { text: String },
}

impl ClientMessage {
    pub fn decode(raw: impl AsRef<[u8]>) -> Result<Self, RelayError> {
        serde_json::from_slice(raw.as_ref()).map_err(|e| RelayError::DecodeFailure(e.to_string()))
    }
}
