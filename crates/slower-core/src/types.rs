use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of a [`ShortName`] in bits.
pub const SHORT_NAME_BITS: u32 = 128;
/// Largest valid prefix length for masked lookups.
pub const MAX_MASK_BITS: u8 = 128;
/// Number of distinct prefix lengths (`0..=128`).
pub const MASK_SLOTS: usize = MAX_MASK_BITS as usize + 1;

/// 128-bit hierarchical content name split into two 64-bit words.
///
/// Field order matters: the derived ordering compares `hi` before `lo`, which
/// is what makes masked prefix ranges contiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShortName {
    /// Most significant 64 bits.
    pub hi: u64,
    /// Least significant 64 bits.
    pub lo: u64,
}

impl ShortName {
    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    pub const fn from_u128(value: u128) -> Self {
        Self {
            hi: (value >> 64) as u64,
            lo: value as u64,
        }
    }

    pub const fn to_u128(self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }

    /// Returns this name with its low `128 - mask_bits` bits cleared.
    ///
    /// # Panics
    ///
    /// Panics if `mask_bits > 128`.
    pub fn masked(self, mask_bits: u8) -> Self {
        Self::from_u128(self.to_u128() & prefix_mask(mask_bits))
    }

    /// Returns this name with its low `128 - mask_bits` bits set to one.
    ///
    /// Together with [`ShortName::masked`] this bounds every name sharing the
    /// first `mask_bits` bits.
    ///
    /// # Panics
    ///
    /// Panics if `mask_bits > 128`.
    pub fn mask_upper(self, mask_bits: u8) -> Self {
        Self::from_u128(self.to_u128() | !prefix_mask(mask_bits))
    }
}

/// Bit mask keeping the leading `mask_bits` bits of a 128-bit value.
fn prefix_mask(mask_bits: u8) -> u128 {
    assert!(
        mask_bits <= MAX_MASK_BITS,
        "mask length {mask_bits} exceeds {MAX_MASK_BITS} bits"
    );
    if mask_bits == 0 {
        0
    } else {
        u128::MAX << (SHORT_NAME_BITS - u32::from(mask_bits))
    }
}

impl From<u128> for ShortName {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl From<ShortName> for u128 {
    fn from(name: ShortName) -> Self {
        name.to_u128()
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:08x}-{:08x}-{:08x}",
            self.hi >> 32,
            self.hi & 0xffff_ffff,
            self.lo >> 32,
            self.lo & 0xffff_ffff
        )
    }
}
