use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;

/// Coarse per-adapter transport health counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportHealthSnapshot {
    pub outbound_send_ok: u64,
    pub outbound_send_err: u64,
    pub inbound_received: u64,
    pub inbound_dropped: u64,
    pub last_error: Option<String>,
}

/// Datagram-oriented transport contract used by relays and clients.
pub trait TransportAdapter {
    /// Opaque endpoint handle: reply address, set member, and sender identity.
    type Peer: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display;
    /// Transport-specific send error.
    type Error: fmt::Display;

    /// Attempts best-effort delivery of one datagram to a peer.
    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error>;
    /// Returns the next inbound datagram and its sender.
    ///
    /// Blocking adapters wait at most their poll interval and then return
    /// `None`, which lets callers re-check whether to keep running.
    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)>;

    /// Best-effort transport health counters for logging.
    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot::default()
    }
}

/// In-memory adapter for tests and simulations.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAdapter {
    inbound: VecDeque<(String, Vec<u8>)>,
    outbound: Vec<(String, Vec<u8>)>,
    payload_hint: Option<usize>,
    drop_outbound: bool,
    fail_sends: bool,
    send_ok: u64,
    send_err: u64,
    recv_ok: u64,
}

impl InMemoryAdapter {
    /// Creates an in-memory adapter that rejects datagrams over `max_payload`.
    pub fn with_payload_hint(max_payload: usize) -> Self {
        Self {
            payload_hint: Some(max_payload),
            ..Self::default()
        }
    }

    /// Queues bytes as inbound traffic from `peer`.
    pub fn enqueue_inbound(&mut self, peer: impl Into<String>, bytes: Vec<u8>) {
        self.inbound.push_back((peer.into(), bytes));
    }

    /// Number of inbound datagrams not yet received.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Drains and returns all outbound sends captured so far.
    pub fn take_outbound(&mut self) -> Vec<(String, Vec<u8>)> {
        std::mem::take(&mut self.outbound)
    }

    /// Drains only the captured sends addressed to `peer`.
    pub fn take_outbound_to(&mut self, peer: &str) -> Vec<Vec<u8>> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.outbound)
            .into_iter()
            .partition(|(dest, _)| dest == peer);
        self.outbound = rest;
        matching.into_iter().map(|(_, bytes)| bytes).collect()
    }

    /// If enabled, outbound sends are silently dropped (loss simulation).
    pub fn set_drop_outbound(&mut self, drop_outbound: bool) {
        self.drop_outbound = drop_outbound;
    }

    /// If enabled, outbound sends fail with an error.
    pub fn set_fail_sends(&mut self, fail_sends: bool) {
        self.fail_sends = fail_sends;
    }
}

/// Moves datagrams `from_adapter` addressed to `to_peer` into `to_adapter`'s
/// inbound queue, tagging them as sent by `from_peer`.
pub fn route_in_memory_outbound(
    from_adapter: &mut InMemoryAdapter,
    to_adapter: &mut InMemoryAdapter,
    from_peer: &str,
    to_peer: &str,
) -> usize {
    let outbound = from_adapter.take_outbound_to(to_peer);
    let moved = outbound.len();
    for bytes in outbound {
        to_adapter.enqueue_inbound(from_peer, bytes);
    }
    moved
}

impl TransportAdapter for InMemoryAdapter {
    type Peer = String;
    type Error = &'static str;

    fn send(&mut self, peer: &Self::Peer, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_sends {
            self.send_err += 1;
            return Err("send disabled");
        }
        if self.payload_hint.is_some_and(|hint| bytes.len() > hint) {
            self.send_err += 1;
            return Err("payload exceeds max payload hint");
        }
        if self.drop_outbound {
            self.send_err += 1;
            return Ok(());
        }
        self.outbound.push((peer.clone(), bytes.to_vec()));
        self.send_ok += 1;
        Ok(())
    }

    fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)> {
        let msg = self.inbound.pop_front();
        if msg.is_some() {
            self.recv_ok += 1;
        }
        msg
    }

    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot {
            outbound_send_ok: self.send_ok,
            outbound_send_err: self.send_err,
            inbound_received: self.recv_ok,
            inbound_dropped: 0,
            last_error: None,
        }
    }
}
