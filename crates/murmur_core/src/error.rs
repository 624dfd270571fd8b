//! Error types for murmur_core

use thiserror::Error;

/// Errors from looking up stores by name
///
/// Store operations themselves cannot fail; only the registry can.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Nothing is registered under this name
    #[error("no store registered as '{name}'")]
    NotFound { name: String },

    /// A store exists under this name but holds another type
    #[error("store '{name}' holds {found}, requested {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Result type for murmur_core operations
pub type Result<T> = std::result::Result<T, StoreError>;
