// SPDX-License-Identifier: MPL-2.0

//! Publicly exported type aliases.

use std::hash::BuildHasherDefault;

/// Map implementation used by the library.
pub type Map<K, V> = rustc_hash::FxHashMap<K, V>;

/// Set implementation used by the library.
pub type Set<V> = rustc_hash::FxHashSet<V>;

/// Insertion-ordered map, used wherever iteration order is part of the
/// determinism guarantees of the algorithm.
pub type OrderedMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<rustc_hash::FxHasher>>;
