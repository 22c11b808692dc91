use slower_core::ShortName;
use slower_transport::{SlowerConnection, SlowerEvent, TransportAdapter};
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::forwarding::{flood_targets, subscriber_targets};
use crate::latency::publish_latency_ms;
use crate::state::RelayState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Datagrams polled from the transport, valid or not.
    pub inbound_messages: usize,
    /// Datagrams dropped because they did not decode.
    pub malformed_messages: usize,
    /// Publications stored for the first time.
    pub publishes: usize,
    /// Publications for names already cached.
    pub duplicate_publishes: usize,
    /// Publications ignored for carrying no payload.
    pub empty_publishes: usize,
    /// Acks returned to publishers.
    pub acks_sent: usize,
    /// Publications flooded to peer relays.
    pub peer_forwards: usize,
    /// Publications delivered to matching subscribers.
    pub subscriber_forwards: usize,
    pub subscribes: usize,
    pub unsubscribes: usize,
    /// Cached publications replayed to new subscribers.
    pub replayed_messages: usize,
    /// Replay candidates whose payload was missing from the cache.
    pub replay_misses: usize,
    /// Acks received from other relays.
    pub ignored_acks: usize,
    /// Individual sends the transport rejected.
    pub send_errors: usize,
}

/// What handling one inbound event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome<P> {
    /// Nothing arrived within the transport's poll interval.
    Idle,
    Malformed {
        sender: P,
    },
    EmptyPublish {
        name: ShortName,
        sender: P,
    },
    Stored {
        name: ShortName,
        peer_forwards: usize,
        subscriber_forwards: usize,
        latency_ms: Option<u64>,
    },
    Duplicate {
        name: ShortName,
    },
    Subscribed {
        name: ShortName,
        mask_bits: u8,
        newly_added: bool,
        replayed: usize,
    },
    Unsubscribed {
        name: ShortName,
        mask_bits: u8,
        removed: bool,
    },
    AckIgnored {
        name: ShortName,
    },
}

/// Parameters for a single `pump_once` / `handle_event` call.
pub struct PumpParams<'a, P> {
    /// Statically configured peer relays.
    pub peers: &'a [P],
    pub config: &'a RelayConfig,
    /// Wall clock used for latency reporting.
    pub now_ms: u64,
    pub stats: &'a mut RuntimeStats,
}

/// Polls the connection once and handles at most one event to completion.
///
/// Malformed datagrams are logged and dropped; they never stop the loop.
pub fn pump_once<A: TransportAdapter>(
    state: &mut RelayState<A::Peer>,
    connection: &mut SlowerConnection<A>,
    params: PumpParams<'_, A::Peer>,
) -> RelayOutcome<A::Peer> {
    match connection.receive_next() {
        Ok(None) => RelayOutcome::Idle,
        Ok(Some(event)) => {
            params.stats.inbound_messages += 1;
            handle_event(state, connection, event, params)
        }
        Err(malformed) => {
            params.stats.inbound_messages += 1;
            params.stats.malformed_messages += 1;
            warn!(
                sender = %malformed.sender,
                len = malformed.len,
                error = %malformed.source,
                "dropping malformed datagram"
            );
            RelayOutcome::Malformed {
                sender: malformed.sender,
            }
        }
    }
}

/// Applies one decoded event to relay state and emits the resulting sends.
pub fn handle_event<A: TransportAdapter>(
    state: &mut RelayState<A::Peer>,
    connection: &mut SlowerConnection<A>,
    event: SlowerEvent<A::Peer>,
    params: PumpParams<'_, A::Peer>,
) -> RelayOutcome<A::Peer> {
    match event {
        SlowerEvent::Publish {
            name,
            payload,
            sender,
        } => handle_publish(state, connection, name, payload, sender, params),
        SlowerEvent::Subscribe {
            name,
            mask_bits,
            sender,
        } => handle_subscribe(state, connection, name, mask_bits, sender, params.stats),
        SlowerEvent::Unsubscribe {
            name,
            mask_bits,
            sender,
        } => {
            let removed = state.subscriptions.remove(name, mask_bits, &sender);
            params.stats.unsubscribes += 1;
            info!(
                name = %name.describe(),
                mask_bits,
                sender = %sender,
                removed,
                "got unsubscribe"
            );
            RelayOutcome::Unsubscribed {
                name,
                mask_bits,
                removed,
            }
        }
        SlowerEvent::Ack { name, sender } => {
            params.stats.ignored_acks += 1;
            debug!(name = %name.describe(), sender = %sender, "ignoring ack");
            RelayOutcome::AckIgnored { name }
        }
    }
}

fn handle_publish<A: TransportAdapter>(
    state: &mut RelayState<A::Peer>,
    connection: &mut SlowerConnection<A>,
    name: ShortName,
    payload: Vec<u8>,
    sender: A::Peer,
    params: PumpParams<'_, A::Peer>,
) -> RelayOutcome<A::Peer> {
    let PumpParams {
        peers,
        config,
        now_ms,
        stats,
    } = params;

    if payload.is_empty() {
        stats.empty_publishes += 1;
        debug!(name = %name.describe(), sender = %sender, "ignoring empty publish");
        return RelayOutcome::EmptyPublish { name, sender };
    }

    let duplicate = state.cache.exists(&name);
    info!(
        name = %name.describe(),
        sender = %sender,
        len = payload.len(),
        duplicate,
        "got publish"
    );

    match connection.send_ack(name, &sender) {
        Ok(()) => stats.acks_sent += 1,
        Err(err) => {
            stats.send_errors += 1;
            warn!(name = %name.describe(), dest = %sender, error = %err, "ack send failed");
        }
    }

    if duplicate {
        stats.duplicate_publishes += 1;
        return RelayOutcome::Duplicate { name };
    }

    if let Err(err) = state.cache.put(name, payload.clone()) {
        stats.empty_publishes += 1;
        error!(error = %err, "publish not stored");
        return RelayOutcome::EmptyPublish { name, sender };
    }
    stats.publishes += 1;

    let latency_ms = if config.report_latency {
        publish_latency_ms(name, &payload, now_ms)
    } else {
        None
    };
    if let Some(latency_ms) = latency_ms {
        info!(name = %name.describe(), latency_ms, "publish latency");
    }

    let mut peer_forwards = 0_usize;
    for peer in flood_targets(peers, &sender) {
        match connection.send_publish(name, &payload, Some(peer)) {
            Ok(_) => {
                peer_forwards += 1;
                debug!(dest = %peer, "sent to relay");
            }
            Err(err) => {
                stats.send_errors += 1;
                warn!(dest = %peer, error = %err, "relay forward failed");
            }
        }
    }

    let subscribers = state.subscriptions.match_all(name);
    let mut subscriber_forwards = 0_usize;
    for subscriber in subscriber_targets(&subscribers, &sender) {
        match connection.send_publish(name, &payload, Some(subscriber)) {
            Ok(_) => {
                subscriber_forwards += 1;
                debug!(dest = %subscriber, "sent to subscriber");
            }
            Err(err) => {
                stats.send_errors += 1;
                warn!(dest = %subscriber, error = %err, "subscriber forward failed");
            }
        }
    }

    stats.peer_forwards += peer_forwards;
    stats.subscriber_forwards += subscriber_forwards;
    RelayOutcome::Stored {
        name,
        peer_forwards,
        subscriber_forwards,
        latency_ms,
    }
}

fn handle_subscribe<A: TransportAdapter>(
    state: &mut RelayState<A::Peer>,
    connection: &mut SlowerConnection<A>,
    name: ShortName,
    mask_bits: u8,
    sender: A::Peer,
    stats: &mut RuntimeStats,
) -> RelayOutcome<A::Peer> {
    let newly_added = state.subscriptions.add(name, mask_bits, sender.clone());
    stats.subscribes += 1;
    info!(
        name = %name.describe(),
        mask_bits,
        sender = %sender,
        newly_added,
        "got subscribe"
    );

    // Highest names first: the closest thing to "most recent" without timestamps.
    let mut replayed = 0_usize;
    for cached in state.cache.find_by_prefix(name, mask_bits).into_iter().rev() {
        let Some(payload) = state.cache.get(&cached) else {
            stats.replay_misses += 1;
            error!(name = %cached.describe(), "cached name has no payload");
            continue;
        };
        match connection.send_publish(cached, payload, Some(&sender)) {
            Ok(_) => {
                replayed += 1;
                debug!(name = %cached.describe(), dest = %sender, "replayed cached publish");
            }
            Err(err) => {
                stats.send_errors += 1;
                warn!(name = %cached.describe(), dest = %sender, error = %err, "replay failed");
            }
        }
    }
    stats.replayed_messages += replayed;

    RelayOutcome::Subscribed {
        name,
        mask_bits,
        newly_added,
        replayed,
    }
}
