use std::collections::BTreeSet;

/// Configured peer relays a new publication floods to: every peer except
/// the one it arrived from.
pub fn flood_targets<'a, P: PartialEq>(
    peers: &'a [P],
    sender: &'a P,
) -> impl Iterator<Item = &'a P> + 'a {
    peers.iter().filter(move |peer| *peer != sender)
}

/// Matching subscribers a new publication is delivered to, minus its sender.
pub fn subscriber_targets<'a, P: Ord>(
    subscribers: &'a BTreeSet<P>,
    sender: &'a P,
) -> impl Iterator<Item = &'a P> + 'a {
    subscribers.iter().filter(move |subscriber| *subscriber != sender)
}
