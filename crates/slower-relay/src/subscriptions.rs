use std::collections::{BTreeMap, BTreeSet};

use slower_core::{ShortName, MASK_SLOTS};

/// Prefix subscriptions bucketed by mask length.
///
/// Bucket `m` maps a name masked to `m` bits onto the endpoints that asked for
/// that prefix. Buckets never share keys, even when masked names collide
/// bitwise across lengths.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry<P> {
    buckets: [BTreeMap<ShortName, BTreeSet<P>>; MASK_SLOTS],
}

impl<P: Ord> Default for SubscriptionRegistry<P> {
    fn default() -> Self {
        Self {
            buckets: std::array::from_fn(|_| BTreeMap::new()),
        }
    }
}

impl<P: Ord + Clone> SubscriptionRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `endpoint` for every name sharing the first `mask_bits` bits
    /// of `name`. Returns true when newly added.
    ///
    /// # Panics
    ///
    /// Panics if `mask_bits > 128`.
    pub fn add(&mut self, name: ShortName, mask_bits: u8, endpoint: P) -> bool {
        let key = name.masked(mask_bits);
        self.buckets[usize::from(mask_bits)]
            .entry(key)
            .or_default()
            .insert(endpoint)
    }

    /// Drops `endpoint` from the matching group. Returns true when it was present.
    ///
    /// # Panics
    ///
    /// Panics if `mask_bits > 128`.
    pub fn remove(&mut self, name: ShortName, mask_bits: u8, endpoint: &P) -> bool {
        let key = name.masked(mask_bits);
        let bucket = &mut self.buckets[usize::from(mask_bits)];
        let Some(group) = bucket.get_mut(&key) else {
            return false;
        };
        let removed = group.remove(endpoint);
        if group.is_empty() {
            bucket.remove(&key);
        }
        removed
    }

    /// Union of every endpoint registered for any prefix of `name`.
    pub fn match_all(&self, name: ShortName) -> BTreeSet<P> {
        let mut matched = BTreeSet::new();
        for (mask_bits, bucket) in (0..=u8::MAX).zip(self.buckets.iter()) {
            if bucket.is_empty() {
                continue;
            }
            if let Some(group) = bucket.get(&name.masked(mask_bits)) {
                matched.extend(group.iter().cloned());
            }
        }
        matched
    }

    /// Total (prefix, endpoint) registrations.
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(BTreeMap::is_empty)
    }
}
