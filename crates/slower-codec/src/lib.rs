//! Datagram envelope codec for the slower relay protocol.
//!
//! Defines the four message kinds exchanged between clients and relays and
//! their CBOR encode/decode helpers.

pub mod error;
pub mod message;

pub use error::CodecError;
pub use message::{decode_message, encode_message, SlowerMessage, ENVELOPE_VERSION, SLOWER_MTU};
