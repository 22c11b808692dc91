use std::sync::atomic::{AtomicBool, Ordering};

use slower_core::timestamp::unix_time_ms;
use slower_transport::{SlowerConnection, TransportAdapter};
use tracing::info;

use crate::config::RelayConfig;
use crate::runtime::{pump_once, PumpParams, RelayOutcome, RuntimeStats};
use crate::state::RelayState;

/// Stateful relay facade around `pump_once`.
///
/// Owns the connection, relay state, the static peer list, config, and stats
/// so the process main loop only has to call `run`.
pub struct RelayRuntime<A: TransportAdapter> {
    pub state: RelayState<A::Peer>,
    pub connection: SlowerConnection<A>,
    pub config: RelayConfig,
    pub stats: RuntimeStats,
    peers: Vec<A::Peer>,
}

impl<A: TransportAdapter> RelayRuntime<A> {
    /// Builds a relay over `adapter`. Repeated peers are kept once, first
    /// occurrence wins.
    pub fn new(adapter: A, peers: Vec<A::Peer>, config: RelayConfig) -> Self {
        let mut unique: Vec<A::Peer> = Vec::with_capacity(peers.len());
        for peer in peers {
            if !unique.contains(&peer) {
                unique.push(peer);
            }
        }
        Self {
            state: RelayState::default(),
            connection: SlowerConnection::new(adapter),
            config,
            stats: RuntimeStats::default(),
            peers: unique,
        }
    }

    pub fn peers(&self) -> &[A::Peer] {
        &self.peers
    }

    pub fn adapter(&self) -> &A {
        self.connection.adapter()
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        self.connection.adapter_mut()
    }

    /// Handles at most one inbound event.
    pub fn tick(&mut self) -> RelayOutcome<A::Peer> {
        self.tick_at(unix_time_ms())
    }

    /// Like [`RelayRuntime::tick`] with an explicit wall clock.
    pub fn tick_at(&mut self, now_ms: u64) -> RelayOutcome<A::Peer> {
        pump_once(
            &mut self.state,
            &mut self.connection,
            PumpParams {
                peers: &self.peers,
                config: &self.config,
                now_ms,
                stats: &mut self.stats,
            },
        )
    }

    /// Ticks until the transport reports nothing pending. Returns the number
    /// of events handled.
    pub fn pump_until_idle(&mut self) -> usize {
        let mut handled = 0_usize;
        while self.tick() != RelayOutcome::Idle {
            handled += 1;
        }
        handled
    }

    /// Runs the event loop until `shutdown` is set.
    ///
    /// The flag is re-checked after every tick, so a blocking transport must
    /// bound each `recv` by its poll interval.
    pub fn run(&mut self, shutdown: &AtomicBool) -> RuntimeStats {
        info!(peers = self.peers.len(), "relay loop started");
        while !shutdown.load(Ordering::Relaxed) {
            self.tick();
        }
        info!(
            cached = self.state.cache.len(),
            subscriptions = self.state.subscriptions.len(),
            "relay loop stopped"
        );
        self.stats
    }
}
