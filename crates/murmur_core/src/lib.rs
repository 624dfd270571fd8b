//! Murmur Core State
//!
//! This crate provides the shared client-side state of the Murmur LAN chat:
//!
//! - **Stores**: observable values with synchronous subscriber notification
//! - **Edge triggers**: boolean stores for one-shot UI events
//! - **Registry**: explicit lookup of stores by name
//! - **App stores**: the message history, profile and modal-closed flag
//!
//! # Example
//!
//! ```rust
//! use murmur_core::{AppStores, Message, MessageData, Profile};
//!
//! let app = AppStores::new();
//!
//! let _render = app.msg_history().subscribe(|history| {
//!     println!("{} messages", history.len());
//! });
//!
//! app.load_profile(Profile::new("ada", 7, 1_700_000_000));
//! app.push_message(Message::Text(MessageData::new(
//!     "ada",
//!     7,
//!     1,
//!     1_700_000_001,
//!     b"hello".to_vec(),
//!     Vec::new(),
//! )));
//!
//! assert_eq!(app.msg_history().get().len(), 1);
//! ```

pub mod app;
pub mod config;
pub mod edge;
pub mod error;
pub mod model;
pub mod registry;
pub mod store;

pub use app::{AppStats, AppStores, StoreStats, MODAL_CLOSED, MSG_HISTORY, PROFILE};
pub use config::StoresConfig;
pub use edge::EdgeTrigger;
pub use error::{Result, StoreError};
pub use model::{Message, MessageData, Profile};
pub use registry::StoreRegistry;
pub use store::{Readable, Store, SubscriberId, Subscription, WeakStore};
