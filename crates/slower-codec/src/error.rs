use thiserror::Error;

/// Errors returned by envelope encode/decode operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR serialization failure.
    #[error("encode error: {0}")]
    Encode(String),
    /// CBOR deserialization failure.
    #[error("decode error: {0}")]
    Decode(String),
    /// Envelope version this build does not understand.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u16),
    /// Message-level schema validation failure.
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
    /// Encoded datagram would not fit the transport MTU.
    #[error("encoded message is {len} bytes, limit is {mtu}")]
    TooLarge { len: usize, mtu: usize },
}
