//! Sharded string interner for names.
//!
//! Interning is O(1) amortized and safe under concurrent access: each shard
//! sits behind its own `RwLock`, so readers of different shards never contend.
//! Interned text lives for the whole process.

use super::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-shard storage for interned strings.
struct InternShard {
    /// Map from string content to local index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by local index.
    strings: Vec<&'static str>,
}

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternError {
    /// Shard exceeded the 28-bit local index space.
    #[error("interner shard {shard_idx} exceeded capacity: {count} strings, max is {max}", max = Name::MAX_LOCAL)]
    ShardOverflow { shard_idx: usize, count: usize },
}

impl InternShard {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(128),
        }
    }

    fn with_empty() -> Self {
        let mut shard = Self::new();
        let empty: &'static str = "";
        shard.map.insert(empty, 0);
        shard.strings.push(empty);
        shard
    }
}

/// Sharded string interner.
///
/// # Thread Safety
/// Uses `RwLock` per shard. Wrap in [`SharedInterner`] to share it.
pub struct StringInterner {
    shards: [RwLock<InternShard>; Name::NUM_SHARDS],
    total_count: AtomicUsize,
}

impl StringInterner {
    /// Create a new interner with Mu's built-in names pre-interned.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            if i == 0 {
                RwLock::new(InternShard::with_empty())
            } else {
                RwLock::new(InternShard::new())
            }
        });

        let interner = Self {
            shards,
            total_count: AtomicUsize::new(1),
        };
        for builtin in BUILTIN_NAMES {
            interner.intern(builtin);
        }
        interner
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Name::NUM_SHARDS
    }

    /// Try to intern a string, returning its Name or an error on overflow.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        self.intern_pending(Pending::Borrowed(s))
    }

    /// Intern a string, returning its Name.
    ///
    /// # Panics
    /// Panics if a shard exceeds its capacity. Use `try_intern` to handle that.
    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Intern an owned String, reusing its allocation when the text is new.
    ///
    /// # Panics
    /// Panics if a shard exceeds its capacity.
    pub fn intern_owned(&self, s: String) -> Name {
        self.intern_pending(Pending::Owned(s))
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn intern_pending(&self, pending: Pending<'_>) -> Result<Name, InternError> {
        let shard_idx = Self::shard_for(pending.as_str());
        let shard_u32 = shard_index_u32(shard_idx);
        let shard = &self.shards[shard_idx];

        // Fast path: already interned
        {
            let guard = shard.read();
            if let Some(&local) = guard.map.get(pending.as_str()) {
                return Ok(Name::new(shard_u32, local));
            }
        }

        let mut guard = shard.write();

        // Another writer may have won the race since the read lock dropped.
        if let Some(&local) = guard.map.get(pending.as_str()) {
            return Ok(Name::new(shard_u32, local));
        }

        let count = guard.strings.len();
        let local = u32::try_from(count)
            .ok()
            .filter(|&local| local <= Name::MAX_LOCAL)
            .ok_or(InternError::ShardOverflow { shard_idx, count })?;

        let leaked = pending.leak();
        guard.strings.push(leaked);
        guard.map.insert(leaked, local);
        self.total_count.fetch_add(1, Ordering::Relaxed);

        Ok(Name::new(shard_u32, local))
    }

    /// Look up the text of a Name.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.shards[name.shard()].read();
        guard.strings[name.local()]
    }

    /// Look up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Name> {
        let shard_idx = Self::shard_for(s);
        let guard = self.shards[shard_idx].read();
        guard
            .map
            .get(s)
            .map(|&local| Name::new(shard_index_u32(shard_idx), local))
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Always false: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Text waiting to be interned.
enum Pending<'a> {
    Borrowed(&'a str),
    Owned(String),
}

impl Pending<'_> {
    fn as_str(&self) -> &str {
        match self {
            Pending::Borrowed(s) => s,
            Pending::Owned(s) => s.as_str(),
        }
    }

    /// Interned text is never freed.
    fn leak(self) -> &'static str {
        let owned = match self {
            Pending::Borrowed(s) => s.to_owned(),
            Pending::Owned(s) => s,
        };
        Box::leak(owned.into_boxed_str())
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "shard indices are bounded by NUM_SHARDS (16)"
)]
#[inline]
fn shard_index_u32(shard_idx: usize) -> u32 {
    shard_idx as u32
}

/// Names every Mu context needs, interned once up front.
const BUILTIN_NAMES: &[&str] = &[
    "void", "nil", "bool", "byte", "short", "char", "int", "int64", "float", "double", "this",
    "=", "+", "-", "*", "/", "==", "!=", "<", "<=", ">", ">=", "__lambda", "size", "resize",
    "push_back", "pop_back", "front", "back", "clear", "erase", "empty", "[]",
];

/// Handles for names the runtime refers to directly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WellKnownNames {
    pub void: Name,
    pub nil: Name,
    pub bool: Name,
    pub byte: Name,
    pub short: Name,
    pub char: Name,
    pub int: Name,
    pub int64: Name,
    pub float: Name,
    pub double: Name,
    pub this: Name,
    pub assign: Name,
    pub lambda: Name,
}

impl WellKnownNames {
    pub fn new(interner: &StringInterner) -> Self {
        Self {
            void: interner.intern("void"),
            nil: interner.intern("nil"),
            bool: interner.intern("bool"),
            byte: interner.intern("byte"),
            short: interner.intern("short"),
            char: interner.intern("char"),
            int: interner.intern("int"),
            int64: interner.intern("int64"),
            float: interner.intern("float"),
            double: interner.intern("double"),
            this: interner.intern("this"),
            assign: interner.intern("="),
            lambda: interner.intern("__lambda"),
        }
    }
}

/// Cheaply cloneable handle to an interner shared by a context and its threads.
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        Self(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Split a dot-qualified name (`a.b.C`) into its components.
///
/// Empty components are skipped, so a leading dot addresses the global scope.
pub fn split_qualified(qualified: &str) -> impl Iterator<Item = &str> {
    qualified.split('.').filter(|part| !part.is_empty())
}
