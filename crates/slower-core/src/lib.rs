//! Core naming primitives shared across the slower crates.
//!
//! Includes the 128-bit [`ShortName`], prefix masking, the message-path
//! name layout, and the payload timestamp convention.

pub mod error;
pub mod name;
pub mod timestamp;
pub mod types;

pub use error::NameError;
pub use name::{decode_name, encode_message_name, encode_name, DecodedName, NamePath};
pub use types::{ShortName, MASK_SLOTS, MAX_MASK_BITS};
