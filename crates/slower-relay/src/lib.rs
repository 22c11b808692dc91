//! Relay engine for slower content publication.
//!
//! This crate stores publications by exact name, tracks prefix subscriptions,
//! floods new content across a static relay mesh, and replays cached content
//! to late subscribers on top of pluggable transports.

pub mod cache;
pub mod config;
pub mod forwarding;
pub mod latency;
pub mod runtime;
pub mod service;
pub mod state;
pub mod subscriptions;

pub use cache::{CacheError, ContentCache};
pub use config::RelayConfig;
pub use runtime::{handle_event, pump_once, PumpParams, RelayOutcome, RuntimeStats};
pub use service::RelayRuntime;
pub use state::RelayState;
pub use subscriptions::SubscriptionRegistry;
