//! Handles for interned text.
//!
//! Every identifier, type name, and operator symbol of a Mu program is a
//! `Name`. Two names are equal exactly when they were produced by interning
//! the same text in the same interner, so comparing names never touches
//! the text.

use std::fmt;

/// A 32-bit handle into a [`StringInterner`](crate::StringInterner).
///
/// The top [`Name::SHARD_BITS`] bits pick the interner shard, the rest index
/// into that shard's string table.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    pub const SHARD_BITS: u32 = 4;

    pub const NUM_SHARDS: usize = 1 << Self::SHARD_BITS;

    /// Largest index a single shard can hand out.
    pub const MAX_LOCAL: u32 = u32::MAX >> Self::SHARD_BITS;

    /// The empty string, interned first in every interner. As a signature
    /// slot it means `void`.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn new(shard: u32, local: u32) -> Self {
        debug_assert!((shard as usize) < Self::NUM_SHARDS);
        debug_assert!(local <= Self::MAX_LOCAL);
        Name((shard << (32 - Self::SHARD_BITS)) | local)
    }

    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> (32 - Self::SHARD_BITS)) as usize
    }

    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Name(<empty>)");
        }
        write!(f, "Name({}:{})", self.shard(), self.local())
    }
}
