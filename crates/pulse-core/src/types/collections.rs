//! Collection type aliases used across the workspace.

/// Fast hash map keyed by short strings and identifiers.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// Fast hash set.
pub type FxHashSet<T> = rustc_hash::FxHashSet<T>;
