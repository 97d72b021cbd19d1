//! Non-owning handles to engine-owned objects
//!
//! The AI never holds references to targets, allies or obstacles. It
//! keeps an [`EntityId`] and asks the world for the current position
//! when it needs one; a stale id simply resolves to nothing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generational handle: lower 32 bits index, upper 32 bits generation
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    bits: u64,
}

impl EntityId {
    /// Create a new id from index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
        }
    }

    /// Id for the first generation of a slot
    #[inline]
    pub const fn from_index(index: u32) -> Self {
        Self::new(index, 0)
    }

    /// Slot index
    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    /// Slot generation
    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Same slot, next generation (the old id becomes stale)
    #[inline]
    pub const fn next_generation(&self) -> Self {
        Self::new(self.index(), self.generation().wrapping_add(1))
    }

    /// Packed `generation << 32 | index`
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_and_generation() {
        let id = EntityId::new(42, 7);
        assert_eq!(id.index(), 42);
        assert_eq!(id.generation(), 7);
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
    }

    #[test]
    fn test_next_generation_is_distinct() {
        let id = EntityId::from_index(3);
        let next = id.next_generation();
        assert_eq!(next.index(), 3);
        assert_ne!(id, next);
    }
}
