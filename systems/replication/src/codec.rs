//! Binary codec for replication messages.

use rowfall_core::ReplicationMessage;
use thiserror::Error;

/// Errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The message could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[source] bincode::Error),
    /// The bytes do not describe a message.
    #[error("decode error: {0}")]
    Decode(#[source] bincode::Error),
}

/// Encodes a message to bytes.
pub fn encode(message: &ReplicationMessage) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(message).map_err(CodecError::Encode)
}

/// Decodes a message from bytes.
pub fn decode(data: &[u8]) -> Result<ReplicationMessage, CodecError> {
    bincode::deserialize(data).map_err(CodecError::Decode)
}
