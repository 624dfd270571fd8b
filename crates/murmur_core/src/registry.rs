//! Named store registry
//!
//! The registry is an ordinary value built at startup and passed to whoever
//! needs to look stores up by name; there is no hidden global. Each entry
//! remembers the value type it was registered with, so a lookup with the
//! wrong type is reported instead of silently creating a second store.
//!
//! ```rust
//! use murmur_core::registry::StoreRegistry;
//! use murmur_core::store::Store;
//!
//! let mut registry = StoreRegistry::new();
//! registry.insert("unread", Store::new(0u32));
//!
//! let unread = registry.get::<u32>("unread").unwrap();
//! unread.set(3);
//! assert_eq!(registry.get::<u32>("unread").unwrap().get(), 3);
//! assert!(registry.get::<String>("unread").is_err());
//! ```

use crate::error::{Result, StoreError};
use crate::store::Store;
use rustc_hash::FxHashMap;
use std::any::{type_name, Any};

/// Type-erased registry slot
struct Entry {
    store: Box<dyn Any>,
    type_name: &'static str,
}

/// Stores keyed by name
#[derive(Default)]
pub struct StoreRegistry {
    entries: FxHashMap<String, Entry>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under `name`
    ///
    /// Returns `true` when an earlier store with that name was replaced.
    pub fn insert<T: Clone + 'static>(&mut self, name: impl Into<String>, store: Store<T>) -> bool {
        let name = name.into();
        tracing::debug!(store = %name, ty = type_name::<T>(), "registering store");
        self.entries
            .insert(
                name,
                Entry {
                    store: Box::new(store),
                    type_name: type_name::<T>(),
                },
            )
            .is_some()
    }

    /// Look up the store registered under `name`
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<Store<T>> {
        let entry = self.entries.get(name).ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })?;
        entry
            .store
            .downcast_ref::<Store<T>>()
            .cloned()
            .ok_or_else(|| StoreError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
                found: entry.type_name,
            })
    }

    /// Look up `name`, creating a store from `init` when it is absent
    pub fn get_or_insert_with<T, F>(&mut self, name: &str, init: F) -> Result<Store<T>>
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        if !self.entries.contains_key(name) {
            self.insert(name, Store::labeled(name.to_string(), init()));
        }
        self.get(name)
    }

    /// Whether any store is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Drop the registry's handle to `name`
    ///
    /// Other handles to the store keep working.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.entries.remove(name).is_some();
        if removed {
            tracing::debug!(store = name, "store removed from registry");
        }
        removed
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered stores
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every registration; stores stay alive through other handles
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, entry)| (name, entry.type_name)))
            .finish()
    }
}
