//! String interning.
//!
//! A [`Symbol`] is a 4-byte handle to an interned string. Identifiers,
//! temporaries and scope names appear over and over in quadruples and
//! symbol tables; interning makes them `Copy`, makes comparison an integer
//! compare, and keeps the IR operand type small.
//!
//! The table is global and append-only: strings are leaked to obtain
//! `'static` references, which is acceptable for a batch compiler whose
//! memory is bounded by the source size. Concurrent access goes through a
//! `DashMap` keyed with `ahash`, so interning never blocks readers.
//!
//! # Examples
//!
//! ```
//! use cmmc_util::Symbol;
//!
//! let a = Symbol::intern("main");
//! let b = Symbol::intern("main");
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "main");
//! ```

use std::fmt;
use std::sync::{LazyLock, RwLock};

use ahash::RandomState;
use dashmap::DashMap;
use static_assertions::assert_eq_size;

/// Interned string handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

assert_eq_size!(Symbol, u32);

/// The global string table.
///
/// `map` resolves string → index; `strings` resolves index → string. Both
/// only ever grow.
struct StringTable {
    map: DashMap<&'static str, u32, RandomState>,
    strings: RwLock<Vec<&'static str>>,
}

static TABLE: LazyLock<StringTable> = LazyLock::new(|| StringTable {
    map: DashMap::with_hasher(RandomState::new()),
    strings: RwLock::new(Vec::new()),
});

impl Symbol {
    /// Interns a string, returning its stable handle.
    pub fn intern(s: &str) -> Symbol {
        if let Some(idx) = TABLE.map.get(s) {
            return Symbol(*idx);
        }
        let mut strings = TABLE.strings.write().expect("string table poisoned");
        // Re-check under the write lock; another thread may have won.
        if let Some(idx) = TABLE.map.get(s) {
            return Symbol(*idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = strings.len() as u32;
        strings.push(leaked);
        TABLE.map.insert(leaked, idx);
        Symbol(idx)
    }

    /// Resolves the handle back to its string.
    pub fn as_str(self) -> &'static str {
        let strings = TABLE.strings.read().expect("string table poisoned");
        strings[self.0 as usize]
    }

    /// The raw table index.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::intern(s)
    }
}
