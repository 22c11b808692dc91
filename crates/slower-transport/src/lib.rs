//! Transport abstractions for the slower relay protocol.
//!
//! The relay engine only depends on the byte-oriented [`adapter::TransportAdapter`]
//! trait and the typed [`connection::SlowerConnection`] built on top of it.

pub mod adapter;
pub mod connection;
pub mod udp;

pub use adapter::{InMemoryAdapter, TransportAdapter, TransportHealthSnapshot};
pub use connection::{ConnectionError, MalformedDatagram, SlowerConnection, SlowerEvent};
pub use udp::{
    canonical_addr, resolve_endpoint, UdpAdapter, UdpAdapterConfig, UdpAdapterError, DEFAULT_PORT,
};
