//! Edge-triggered boolean signals
//!
//! An [`EdgeTrigger`] is a `Store<bool>` whose `true` state means "an event
//! just happened" rather than a steady condition. Whoever handles the event
//! resets it to `false`. The modal-closed flag is the canonical user: the
//! dialog layer fires it on Escape or an outside click, and the component
//! that owns the modal styling consumes it.
//!
//! Because notifications carry the value that was written, every consumer
//! registered when the trigger fires observes the `true` edge, even if an
//! earlier consumer already reset the flag.

use crate::store::{Store, Subscription};

/// Boolean store with a reset-after-handling contract
#[derive(Clone, Debug)]
pub struct EdgeTrigger {
    store: Store<bool>,
}

impl EdgeTrigger {
    /// A lowered flag in a fresh store
    pub fn new() -> Self {
        Self::from_store(Store::new(false))
    }

    /// Wrap an existing store, keeping its current value
    pub fn from_store(store: Store<bool>) -> Self {
        Self { store }
    }

    /// Raise the flag
    pub fn fire(&self) {
        self.store.set(true);
    }

    /// Lower the flag
    pub fn reset(&self) {
        self.store.set(false);
    }

    /// Whether an edge is waiting to be handled
    pub fn is_raised(&self) -> bool {
        self.store.get()
    }

    /// Consume a pending edge
    ///
    /// Returns whether the flag was raised, lowering it if so.
    pub fn take(&self) -> bool {
        let raised = self.store.get();
        if raised {
            self.store.set(false);
        }
        raised
    }

    /// Run `handler` for every `true` edge, then lower the flag
    ///
    /// The flag is only written back when it is still raised, so several
    /// handlers reacting to one edge produce a single reset.
    pub fn on_fire<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        let store = self.store.downgrade();
        self.store.subscribe(move |raised| {
            if !*raised {
                return;
            }
            handler();
            if let Some(store) = store.upgrade() {
                if store.get() {
                    store.set(false);
                }
            }
        })
    }

    /// The underlying store, for plain `get`/`set`/`subscribe` access
    pub fn store(&self) -> &Store<bool> {
        &self.store
    }
}

impl Default for EdgeTrigger {
    fn default() -> Self {
        Self::new()
    }
}
