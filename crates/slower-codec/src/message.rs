use serde::{Deserialize, Serialize};
use slower_core::{ShortName, MAX_MASK_BITS};

use crate::error::CodecError;

/// Envelope schema version written by this build.
pub const ENVELOPE_VERSION: u16 = 1;
/// Largest datagram a sender may emit.
pub const SLOWER_MTU: usize = 1200;

/// One relay protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlowerMessage {
    /// Opaque payload published under `name`.
    Publish {
        name: ShortName,
        #[serde(with = "serde_bytes")]
        payload: Vec<u8>,
    },
    /// Request delivery of everything sharing the first `mask_bits` bits of `name`.
    Subscribe { name: ShortName, mask_bits: u8 },
    /// Withdraw a previous subscription with the same name and mask.
    Unsubscribe { name: ShortName, mask_bits: u8 },
    /// Receipt for a publish of `name`.
    Ack { name: ShortName },
}

impl SlowerMessage {
    /// Name the message refers to.
    pub fn name(&self) -> ShortName {
        match self {
            Self::Publish { name, .. }
            | Self::Subscribe { name, .. }
            | Self::Unsubscribe { name, .. }
            | Self::Ack { name } => *name,
        }
    }

    /// Validates payload and mask invariants.
    pub fn validate(&self) -> Result<(), CodecError> {
        match self {
            Self::Publish { payload, .. } if payload.is_empty() => Err(
                CodecError::InvalidMessage("publish payload must not be empty"),
            ),
            Self::Subscribe { mask_bits, .. } | Self::Unsubscribe { mask_bits, .. }
                if *mask_bits > MAX_MASK_BITS =>
            {
                Err(CodecError::InvalidMessage("mask length exceeds 128 bits"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u16,
    message: &'a SlowerMessage,
}

#[derive(Deserialize)]
struct Envelope {
    version: u16,
    message: SlowerMessage,
}

/// Encodes a message as one CBOR datagram after validation.
pub fn encode_message(message: &SlowerMessage) -> Result<Vec<u8>, CodecError> {
    message.validate()?;
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(
        &EnvelopeRef {
            version: ENVELOPE_VERSION,
            message,
        },
        &mut bytes,
    )
    .map_err(|e| CodecError::Encode(e.to_string()))?;
    if bytes.len() > SLOWER_MTU {
        return Err(CodecError::TooLarge {
            len: bytes.len(),
            mtu: SLOWER_MTU,
        });
    }
    Ok(bytes)
}

/// Decodes and validates one CBOR datagram.
pub fn decode_message(bytes: &[u8]) -> Result<SlowerMessage, CodecError> {
    let envelope: Envelope =
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(CodecError::UnsupportedVersion(envelope.version));
    }
    envelope.message.validate()?;
    Ok(envelope.message)
}
