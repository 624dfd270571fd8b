//! Application state
//!
//! [`AppStores`] owns the three stores the chat UI shares: the message
//! history, the active profile and the modal-closed signal. It is created
//! once at startup and handed to every component that reads or writes them.

use crate::config::StoresConfig;
use crate::edge::EdgeTrigger;
use crate::model::{Message, Profile};
use crate::registry::StoreRegistry;
use crate::store::Store;

/// Registry name of the message history store
pub const MSG_HISTORY: &str = "msg_history";
/// Registry name of the profile store
pub const PROFILE: &str = "profile";
/// Registry name of the modal-closed flag
pub const MODAL_CLOSED: &str = "modal_closed";

/// The chat UI's shared stores
pub struct AppStores {
    msg_history: Store<Vec<Message>>,
    profile: Store<Option<Profile>>,
    modal_closed: EdgeTrigger,
    registry: StoreRegistry,
    config: StoresConfig,
}

impl AppStores {
    pub fn new() -> Self {
        Self::with_config(StoresConfig::default())
    }

    pub fn with_config(config: StoresConfig) -> Self {
        let msg_history = Store::labeled(MSG_HISTORY, Vec::new());
        let profile = Store::labeled(PROFILE, None);
        let modal_closed = EdgeTrigger::from_store(Store::labeled(MODAL_CLOSED, false));

        let mut registry = StoreRegistry::new();
        registry.insert(MSG_HISTORY, msg_history.clone());
        registry.insert(PROFILE, profile.clone());
        registry.insert(MODAL_CLOSED, modal_closed.store().clone());

        tracing::debug!(history_limit = ?config.history_limit, "app stores created");

        Self {
            msg_history,
            profile,
            modal_closed,
            registry,
            config,
        }
    }

    /// Messages in arrival order
    pub fn msg_history(&self) -> &Store<Vec<Message>> {
        &self.msg_history
    }

    /// Current profile, `None` until one is loaded
    pub fn profile(&self) -> &Store<Option<Profile>> {
        &self.profile
    }

    /// Raised when a modal is dismissed by Escape or an outside click
    pub fn modal_closed(&self) -> &EdgeTrigger {
        &self.modal_closed
    }

    /// Named handles to every store, the three built-ins included
    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// For registering additional application stores
    pub fn registry_mut(&mut self) -> &mut StoreRegistry {
        &mut self.registry
    }

    /// Settings the stores were built with
    pub fn config(&self) -> &StoresConfig {
        &self.config
    }

    /// Append a message, trimming the oldest entries past the history limit
    pub fn push_message(&self, message: Message) {
        let limit = self.config.history_limit;
        self.msg_history.update(|mut history| {
            history.push(message);
            if let Some(limit) = limit {
                let excess = history.len().saturating_sub(limit);
                history.drain(..excess);
            }
            history
        });
    }

    pub fn clear_history(&self) {
        self.msg_history.set(Vec::new());
    }

    pub fn load_profile(&self, profile: Profile) {
        tracing::debug!(name = %profile.name, uid = profile.uid, "profile loaded");
        self.profile.set(Some(profile));
    }

    /// Back to "no profile", e.g. on logout
    pub fn clear_profile(&self) {
        self.profile.set(None);
    }

    /// Version and observer counts of the three stores
    pub fn stats(&self) -> AppStats {
        AppStats {
            msg_history: StoreStats::of(&self.msg_history),
            profile: StoreStats::of(&self.profile),
            modal_closed: StoreStats::of(self.modal_closed.store()),
        }
    }
}

impl Default for AppStores {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about one store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub version: u64,
    pub subscribers: usize,
}

impl StoreStats {
    fn of<T: 'static>(store: &Store<T>) -> Self {
        Self {
            version: store.version(),
            subscribers: store.subscriber_count(),
        }
    }
}

/// Statistics about the application stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppStats {
    pub msg_history: StoreStats,
    pub profile: StoreStats,
    pub modal_closed: StoreStats,
}
