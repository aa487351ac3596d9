//! Adapters layer - External system implementations.
//!
//! Implementations of the `ports` traits that ship with the crate. The
//! API-client capabilities (list-watch, access review, tunnel transport)
//! come from the surrounding application; the one adapter here is the
//! JSON-file forward-config store.

pub mod file_store;

// Re-export main types for convenience
pub use file_store::FileForwardStore;
