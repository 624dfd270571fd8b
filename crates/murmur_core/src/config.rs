//! Store configuration
//!
//! Loaded by the application shell (the `[stores]` table of `murmur.toml`)
//! and handed to [`AppStores::with_config`](crate::app::AppStores::with_config).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoresConfig {
    /// Keep at most this many messages in the history, dropping the oldest.
    /// Unbounded when unset.
    #[serde(default)]
    pub history_limit: Option<usize>,
}

impl StoresConfig {
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }
}
