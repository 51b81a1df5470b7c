//! fcc-util - Foundation types shared by every compiler phase.
//!
//! This crate holds the diagnostic sink, the `ErrorReported` sentinel that
//! parse and analysis functions thread through `Result`, typed-index
//! helpers for arena-allocated tables, and hash-map aliases used across
//! the workspace.

mod diagnostic;

pub use diagnostic::{Diagnostic, Handler, Level};

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;
use thiserror::Error;

pub use rustc_hash::{FxHashMap, FxHashSet};

/// An insertion-ordered map hashed with `FxHasher`.
///
/// Symbol tables must iterate in declaration order (parameter layout and
/// struct field offsets depend on it), so plain hash maps are not usable
/// there.
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Marker returned by anything that has already emitted a diagnostic
/// through a [`Handler`].
///
/// Callers must not continue semantic work after receiving this; they
/// propagate it with `?` until the top-level entry point turns it into a
/// nonzero exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("compilation halted due to a previously reported error")]
pub struct ErrorReported;

/// Result alias for fallible compiler phases.
pub type PResult<T> = Result<T, ErrorReported>;

/// Trait for types that can be used as typed vector indices.
pub trait Idx: Copy + Eq + PartialEq {
    /// Convert from usize to the index type.
    fn from_usize(idx: usize) -> Self;

    /// Convert the index to usize for slot addressing.
    fn index(self) -> usize;
}

/// Defines a `u32`-backed newtype index implementing [`Idx`].
#[macro_export]
macro_rules! define_idx {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    define_idx!(TestId);

    #[test]
    fn test_define_idx_roundtrip() {
        let id = TestId::from_usize(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id, TestId(7));
    }

    #[test]
    fn test_index_map_preserves_insertion_order() {
        let mut map: FxIndexMap<&str, u32> = FxIndexMap::default();
        map.insert("c", 2);
        map.insert("a", 0);
        map.insert("b", 1);
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }
}
