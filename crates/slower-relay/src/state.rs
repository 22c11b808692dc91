use crate::cache::ContentCache;
use crate::subscriptions::SubscriptionRegistry;

/// Mutable relay-local state touched by the event loop.
#[derive(Debug, Clone)]
pub struct RelayState<P> {
    /// Every publication seen, keyed by exact name.
    pub cache: ContentCache,
    /// Prefix subscriptions from clients and relays.
    pub subscriptions: SubscriptionRegistry<P>,
}

impl<P: Ord> Default for RelayState<P> {
    fn default() -> Self {
        Self {
            cache: ContentCache::default(),
            subscriptions: SubscriptionRegistry::default(),
        }
    }
}
