use std::collections::BTreeMap;

use slower_core::ShortName;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("refusing to cache an empty payload for {0}")]
    EmptyPayload(ShortName),
}

/// Exact-name payload store with ordered prefix queries.
///
/// Entries live for the process lifetime; there is no eviction.
#[derive(Debug, Default, Clone)]
pub struct ContentCache {
    entries: BTreeMap<ShortName, Vec<u8>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `payload` under `name`, replacing any previous value.
    pub fn put(&mut self, name: ShortName, payload: Vec<u8>) -> Result<(), CacheError> {
        if payload.is_empty() {
            return Err(CacheError::EmptyPayload(name));
        }
        self.entries.insert(name, payload);
        Ok(())
    }

    pub fn exists(&self, name: &ShortName) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the stored payload, or `None` on a miss.
    pub fn get(&self, name: &ShortName) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Returns every stored name sharing the first `mask_bits` bits of `name`,
    /// in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `mask_bits > 128`.
    pub fn find_by_prefix(&self, name: ShortName, mask_bits: u8) -> Vec<ShortName> {
        let low = name.masked(mask_bits);
        let high = name.mask_upper(mask_bits);
        self.entries.range(low..=high).map(|(key, _)| *key).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
